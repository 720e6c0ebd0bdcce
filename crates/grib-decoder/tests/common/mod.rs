//! Minimal synthetic GRIB2 messages for section-level tests.
//!
//! Only the framing and Section 3 are meaningful; the product and data
//! sections are fixed-size placeholders.

pub struct Grib2Builder {
    template: u16,
    ni: u32,
    nj: u32,
    la1: i32,
    lo1: i32,
    la2: i32,
    lo2: i32,
    di: u32,
    dj: u32,
    scanning_mode: u8,
}

impl Grib2Builder {
    /// Global half-degree grid scanning north to south, like GFS 0p50.
    pub fn new_gfs_half_degree() -> Self {
        Self {
            template: 0,
            ni: 720,
            nj: 361,
            la1: 90_000_000,
            lo1: 0,
            la2: -90_000_000,
            lo2: 359_500_000,
            di: 500_000,
            dj: 500_000,
            scanning_mode: 0,
        }
    }

    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self
    }

    pub fn with_origin(mut self, la1: i32, lo1: i32) -> Self {
        self.la1 = la1;
        self.lo1 = lo1;
        self
    }

    pub fn with_increments(mut self, di: u32, dj: u32) -> Self {
        self.di = di;
        self.dj = dj;
        self
    }

    pub fn with_template(mut self, template: u16) -> Self {
        self.template = template;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.build_section1(),
            self.build_section3(),
            placeholder_section(4, 34),
            placeholder_section(5, 21),
            vec![0, 0, 0, 6, 6, 255],
            placeholder_section(7, 5),
        ];
        let body_len: usize = sections.iter().map(Vec::len).sum();
        let message_length = 16 + body_len + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(0); // Discipline
        message.push(2); // Edition
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = placeholder_section(1, 21);
        section[5..7].copy_from_slice(&7u16.to_be_bytes()); // NCEP
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let section_length: u32 = 14 + 58;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(3);
        section.push(0); // Source of grid definition
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0);
        section.push(0);
        section.extend_from_slice(&self.template.to_be_bytes());

        section.push(6); // Shape of the Earth
        section.extend_from_slice(&[0; 15]); // Radius and axes
        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
        section.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // Subdivisions
        section.extend_from_slice(&encode_angle(self.la1));
        section.extend_from_slice(&encode_angle(self.lo1));
        section.push(48); // Resolution and component flags
        section.extend_from_slice(&encode_angle(self.la2));
        section.extend_from_slice(&encode_angle(self.lo2));
        section.extend_from_slice(&self.di.to_be_bytes());
        section.extend_from_slice(&self.dj.to_be_bytes());
        section.push(self.scanning_mode);

        section
    }
}

fn placeholder_section(number: u8, length: u32) -> Vec<u8> {
    let mut section = vec![0u8; length as usize];
    section[0..4].copy_from_slice(&length.to_be_bytes());
    section[4] = number;
    section
}

fn encode_angle(microdegrees: i32) -> [u8; 4] {
    let magnitude = microdegrees.unsigned_abs();
    let raw = if microdegrees < 0 {
        magnitude | 0x8000_0000
    } else {
        magnitude
    };
    raw.to_be_bytes()
}

// A fixed-value RngCore, for reproducible delta seeds in tests.
pub struct ConstRngCore {
    c: u64,
}

impl ConstRngCore {
    pub fn new(c: u64) -> Self {
        ConstRngCore { c }
    }
}

impl rand::RngCore for ConstRngCore {
    fn next_u32(&mut self) -> u32 {
        self.c as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.c
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for (i, x) in dest.iter_mut().enumerate() {
            *x = (self.c >> ((i % 8) * 8)) as u8;
        }
    }
}

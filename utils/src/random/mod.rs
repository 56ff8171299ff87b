pub fn random_fill(buffer: &mut [u8]) {
    for i in buffer {
        *i = rand::random();
    }
}

pub fn random_u32() -> u32 {
    rand::random::<u32>()
}

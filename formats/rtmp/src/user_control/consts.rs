pub const USER_CONTROL_MESSAGE_TYPE: u8 = 0x04;
pub const USER_CONTROL_CSID: u8 = 0x02;
pub const USER_CONTROL_MESSAGE_STREAM_ID: u8 = 0x00;

// Common utils

// Single bit selection.
macro_rules! bit {
    ($bit_num:expr) => {
        bit!($bit_num, u8)
    };
    ($bit_num:expr, u8) => {
        (1 << $bit_num) as u8
    };
    ($bit_num:expr, u16) => {
        (1 << $bit_num) as u16
    };
}

// Multiple bit selection.
macro_rules! bits {
    [ $($bit_num:expr),* ] => {
        $(bit!($bit_num))|*
    };
}

// Multiple bit selection for 16-bit values.
macro_rules! bits16 {
    [ $($bit_num:expr),* ] => {
        $(bit!($bit_num, u16))|*
    };
}

// Test a single bit.
macro_rules! test_bit {
    ($val:expr, $bit_num:expr) => {
        test_bit!($val, $bit_num, u16)
    };
    ($val:expr, $bit_num:expr, u8) => {
        (($val as u8) & bit!($bit_num, u8)) != 0
    };
    ($val:expr, $bit_num:expr, u16) => {
        (($val as u16) & bit!($bit_num, u16)) != 0
    };
}

// Make a 16-bit value from two 8-bit values.
macro_rules! make16 {
    ($hi:expr, $lo:expr) => {
        (($hi as u16) << 8) | ($lo as u16)
    };
}

// Get the low byte of a 16-bit value.
macro_rules! lo {
    ($val:expr) => {
        $val as u8
    };
}

// Set the low byte of a 16-bit value.
macro_rules! set_lo {
    ($val:expr, $lo:expr) => {
        ($val & 0xFF00) | ($lo as u16)
    };
}

// Get the high byte of a 16-bit value.
macro_rules! hi {
    ($val:expr) => {
        ($val >> 8) as u8
    };
}

// Set the high byte of a 16-bit value.
macro_rules! set_hi {
    ($val:expr, $hi:expr) => {
        ($val & 0x00FF) | (($hi as u16) << 8)
    };
}

// Get the low nybble of a byte.
macro_rules! lo_nybble {
    ($val:expr) => {
        ($val & 0xF) as u8
    };
}

// Get the high nybble of a byte.
macro_rules! hi_nybble {
    ($val:expr) => {
        (($val >> 4) & 0xF) as u8
    };
}

// Clamp val between min and max.
macro_rules! clamp {
    ($val:expr, $min:expr, $max:expr) => {
        std::cmp::min($max, std::cmp::max($min, $val))
    };
}

// Clamp a 32-bit value into the signed 16-bit range.
macro_rules! clamp16 {
    ($val:expr) => {
        clamp!($val, std::i16::MIN as i32, std::i16::MAX as i32)
    };
}

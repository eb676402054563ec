//! 浮点数与寄存器对的互转。
//!
//! IEEE-754 单精度，大端字节序：`word0 = bytes[0..2]`，`word1 = bytes[2..4]`。

/// 将 f32 编码为两个 16 位寄存器。
pub fn encode_f32_pair(value: f32) -> [u16; 2] {
    let bytes = value.to_be_bytes();
    [
        u16::from_be_bytes([bytes[0], bytes[1]]),
        u16::from_be_bytes([bytes[2], bytes[3]]),
    ]
}

/// 将两个 16 位寄存器解码为 f32。
pub fn decode_f32_pair(words: [u16; 2]) -> f32 {
    let high = words[0].to_be_bytes();
    let low = words[1].to_be_bytes();
    f32::from_be_bytes([high[0], high[1], low[0], low[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        // 12.5 = 0x41480000
        assert_eq!(encode_f32_pair(12.5), [0x4148, 0x0000]);
        // -3.25 = 0xC0500000
        assert_eq!(encode_f32_pair(-3.25), [0xC050, 0x0000]);
        assert_eq!(encode_f32_pair(0.0), [0, 0]);
    }

    #[test]
    fn test_decode_matches_encode() {
        for value in [1.0f32, -1.5, 3.14159, 1.0e-30, f32::MAX, f32::MIN_POSITIVE] {
            assert_eq!(decode_f32_pair(encode_f32_pair(value)), value);
        }
        assert!(decode_f32_pair(encode_f32_pair(f32::NAN)).is_nan());
    }
}

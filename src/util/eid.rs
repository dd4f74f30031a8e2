const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Convert a VAN ID (or export request ID) into a VoteBuilder EID
///
/// The EID is the reversed hex of the ID followed by a check letter.
pub fn convert_to_eid(id: u64) -> String {
    let reversed: String = format!("{:x}", id).chars().rev().collect();
    let letter = ALPHABET[(id % 17) as usize] as char;
    format!("EID{}{}", reversed, letter).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_to_eid() {
        assert_eq!(convert_to_eid(1), "EID1B");
        assert_eq!(convert_to_eid(4391), "EID7211F");
        assert_eq!(convert_to_eid(0), "EID0A");
    }
}

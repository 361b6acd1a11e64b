use rand::{rngs::StdRng, Rng, SeedableRng};

/// Length of an object identifier in a `project.pbxproj` file.
pub const IDENTIFIER_LEN: usize = 24;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Source of fresh object identifiers.
///
/// Identifiers are 24 uppercase hexadecimal characters, the same shape Xcode
/// uses for the objects it creates itself.
pub trait IdentifierGenerator {
    fn next_identifier(&mut self) -> String;
}

pub struct RandomIdentifiers {
    rng: StdRng,
}

impl RandomIdentifiers {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIdentifiers {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierGenerator for RandomIdentifiers {
    fn next_identifier(&mut self) -> String {
        (0..IDENTIFIER_LEN)
            .map(|_| HEX_DIGITS[self.rng.random_range(0..HEX_DIGITS.len())] as char)
            .collect()
    }
}

impl<F> IdentifierGenerator for F
where
    F: FnMut() -> String,
{
    fn next_identifier(&mut self) -> String {
        self()
    }
}

pub fn is_valid_identifier(id: &str) -> bool {
    id.len() == IDENTIFIER_LEN && id.bytes().all(|b| HEX_DIGITS.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_identifiers_are_24_uppercase_hex() {
        let mut ids = RandomIdentifiers::new();
        for _ in 0..100 {
            let id = ids.next_identifier();
            assert!(is_valid_identifier(&id), "{id}");
        }
    }

    #[test]
    fn seeded_identifiers_are_reproducible() {
        let mut a = RandomIdentifiers::seeded(42);
        let mut b = RandomIdentifiers::seeded(42);
        assert_eq!(a.next_identifier(), b.next_identifier());
        assert_ne!(a.next_identifier(), RandomIdentifiers::seeded(43).next_identifier());
    }

    #[test]
    fn closures_are_generators() {
        let mut n = 0;
        let mut ids = move || {
            n += 1;
            format!("{:024X}", n)
        };
        assert_eq!(ids.next_identifier(), "000000000000000000000001");
        assert_eq!(ids.next_identifier(), "000000000000000000000002");
    }

    #[test]
    fn validation_rejects_lowercase_and_wrong_length() {
        assert!(!is_valid_identifier("abcdefabcdefabcdefabcdef"));
        assert!(!is_valid_identifier("ABCDEF"));
        assert!(is_valid_identifier("504EC3131FED79650016851F"));
    }
}

use std::sync::Arc;

/// Length of every identifier produced by [`new_id`].
pub const ID_LENGTH: usize = 26;

/// Source of fresh identifiers, injected into stores at construction.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Returns a random identifier: a v4 uuid in unpadded lowercase base32.
pub fn new_id() -> String {
    base32::encode(
        base32::Alphabet::Rfc4648Lower { padding: false },
        uuid::Uuid::new_v4().as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn new_id_test() {
        let id = new_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn new_id_unique() {
        let ids = (0..1000).map(|_| new_id()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn generator_from_fn() {
        let generator: IdGenerator = Arc::new(new_id);
        assert_eq!(generator().len(), ID_LENGTH);
    }
}

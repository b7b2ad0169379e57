//! Instance sizes and regions offered to users.

use rand::seq::IndexedRandom;

pub const SIZES: &[&str] = &["512mb", "1gb", "2gb"];

pub const DEFAULT_SIZE: &str = "512mb";

pub const REGIONS: &[&str] = &[
    // San Francisco
    "sfo1", "sfo2", //
    // New York
    "nyc1", "nyc2", "nyc3", //
    // Toronto
    "tor1",
];

pub const DEFAULT_IMAGE: &str = "ubuntu-16-04-x64";

pub fn is_known_size(size: &str) -> bool {
    SIZES.contains(&size)
}

pub fn is_known_region(region: &str) -> bool {
    REGIONS.contains(&region)
}

/// Pick a region uniformly at random, for users who don't care where their node runs.
pub fn random_region() -> &'static str {
    REGIONS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(REGIONS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_size_is_offered() {
        assert!(is_known_size(DEFAULT_SIZE));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(!is_known_size("64gb"));
        assert!(!is_known_region("ams3"));
        assert!(!is_known_region("NYC1"));
    }

    #[test]
    fn random_region_comes_from_the_list() {
        for _ in 0..50 {
            assert!(is_known_region(random_region()));
        }
    }
}

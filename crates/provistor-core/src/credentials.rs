//! Generated login credentials for a node.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Words per generated passphrase; 12 distinct words from 256 is roughly 95 bits.
pub const PASSPHRASE_WORDS: usize = 12;

pub const DEFAULT_OS_USER: &str = "provistor";
pub const DEFAULT_APP_USER: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

impl Login {
    pub fn generate(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: passphrase(PASSPHRASE_WORDS),
        }
    }
}

/// OS-level and application-level logins, generated independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub os_login: Login,
    pub app_login: Login,
}

impl Credentials {
    pub fn generate(os_user: &str, app_user: &str) -> Self {
        Self {
            os_login: Login::generate(os_user),
            app_login: Login::generate(app_user),
        }
    }
}

/// Space-separated passphrase of `words` distinct words.
pub fn passphrase(words: usize) -> String {
    let mut rng = rand::rng();
    WORDLIST
        .choose_multiple(&mut rng, words)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

const WORDLIST: [&str; 256] = [
    "able", "acid", "aged", "also", "area", "army", "away", "baby", "back", "ball", "band", "bank",
    "base", "bath", "bear", "beat", "been", "beer", "bell", "belt", "best", "bird", "blow", "blue",
    "boat", "body", "bone", "book", "boot", "born", "boss", "both", "bowl", "bulk", "burn", "bush",
    "busy", "cake", "calm", "came", "camp", "card", "care", "cart", "case", "cash", "cast", "cell",
    "chat", "chip", "city", "clay", "club", "coal", "coat", "code", "cold", "come", "cook", "cool",
    "cope", "copy", "cord", "core", "corn", "cost", "crew", "crop", "dark", "data", "date", "dawn",
    "deal", "dear", "debt", "deck", "deep", "deer", "desk", "dial", "diet", "dirt", "dish", "disk",
    "dock", "door", "dose", "down", "draw", "drop", "drum", "duck", "dust", "duty", "each", "earn",
    "ease", "east", "easy", "edge", "else", "even", "ever", "exit", "face", "fact", "fair", "fall",
    "farm", "fast", "fear", "feed", "feel", "file", "fill", "film", "find", "fine", "fire", "firm",
    "fish", "five", "flag", "flat", "flow", "foam", "fold", "folk", "food", "foot", "fork", "form",
    "fort", "four", "free", "frog", "fuel", "full", "fund", "gain", "game", "gate", "gear", "gift",
    "girl", "give", "glad", "glow", "goal", "goat", "gold", "golf", "good", "gray", "grid", "grow",
    "gulf", "hair", "half", "hall", "hand", "hang", "hard", "harm", "hawk", "head", "heap", "hear",
    "heat", "help", "herb", "hero", "hide", "high", "hill", "hint", "hold", "hole", "home", "hood",
    "hook", "hope", "horn", "host", "hour", "huge", "hunt", "idea", "inch", "iron", "item", "jazz",
    "join", "joke", "jump", "jury", "keen", "keep", "kick", "kind", "king", "kite", "knee", "knot",
    "lake", "lamp", "land", "lane", "last", "late", "lawn", "lead", "leaf", "lean", "left", "lens",
    "life", "lift", "like", "lime", "line", "link", "lion", "list", "live", "load", "loan", "lock",
    "loft", "long", "look", "loop", "lord", "loud", "love", "luck", "lung", "made", "mail", "main",
    "make", "malt", "many", "mark", "mask", "mass", "meal", "meat", "melt", "menu", "mild", "milk",
    "mill", "mind", "mine", "mint",
];

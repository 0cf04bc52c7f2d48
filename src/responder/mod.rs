//! Canned reply generation
//!
//! A stand-in for a real dialogue backend: case-insensitive keyword rules
//! evaluated in a fixed priority order, first match wins, with a generic
//! fallback. Pluggable behind the `ResponseGenerator` trait.

use rand::seq::SliceRandom;
use tracing::debug;

/// The fixed joke set
pub const JOKES: [&str; 3] = [
    "Why don't scientists trust atoms? Because they make up everything!",
    "What do you call a fake noodle? An impasta!",
    "Why did the scarecrow win an award? He was outstanding in his field!",
];

/// Maps user input text to a reply
pub trait ResponseGenerator: Send + Sync {
    /// Produce a reply for the given input
    fn generate(&self, input: &str) -> String;
}

/// How a matched rule renders its reply
enum Reply {
    /// Fixed text
    Fixed(String),
    /// The current local time, formatted for speech
    CurrentTime,
    /// A random pick from the joke set
    Joke,
}

/// One keyword rule: any needle contained in the input triggers the reply
struct Rule {
    needles: &'static [&'static str],
    reply: Reply,
}

/// Keyword-table response generator
///
/// Deterministic except for the joke branch (random pick) and the
/// time-of-day branch (current clock).
pub struct KeywordResponder {
    rules: Vec<Rule>,
    fallback: String,
}

impl KeywordResponder {
    /// Build the rule table for an assistant with the given display name
    pub fn new(assistant_name: impl Into<String>) -> Self {
        let name = assistant_name.into();

        let rules = vec![
            Rule {
                needles: &["hello", "hi"],
                reply: Reply::Fixed(
                    "Hello! I'm your AI voice assistant. How can I help you today?".to_string(),
                ),
            },
            Rule {
                needles: &["how are you"],
                reply: Reply::Fixed(
                    "I'm doing great, thank you for asking! I'm here and ready to assist you \
                     with anything you need."
                        .to_string(),
                ),
            },
            Rule {
                needles: &["weather"],
                reply: Reply::Fixed(
                    "I don't have access to real-time weather data, but I'd recommend checking \
                     a weather app or website for the most accurate forecast in your area."
                        .to_string(),
                ),
            },
            Rule {
                needles: &["time"],
                reply: Reply::CurrentTime,
            },
            Rule {
                needles: &["name"],
                reply: Reply::Fixed(format!(
                    "I'm {name}, your AI voice assistant. I'm here to help answer your \
                     questions and have conversations with you."
                )),
            },
            Rule {
                needles: &["thank"],
                reply: Reply::Fixed(
                    "You're welcome! Is there anything else I can help you with?".to_string(),
                ),
            },
            Rule {
                needles: &["bye", "goodbye"],
                reply: Reply::Fixed(
                    "Goodbye! It was nice chatting with you. Feel free to come back anytime!"
                        .to_string(),
                ),
            },
            Rule {
                needles: &["joke"],
                reply: Reply::Joke,
            },
        ];

        Self {
            rules,
            fallback: "That's an interesting question! While I'm a demo assistant with limited \
                       capabilities, I'm designed to show how voice interactions work. In a full \
                       implementation, I would connect to an AI service to provide more \
                       comprehensive responses."
                .to_string(),
        }
    }
}

impl Default for KeywordResponder {
    fn default() -> Self {
        Self::new("Nova")
    }
}

impl ResponseGenerator for KeywordResponder {
    fn generate(&self, input: &str) -> String {
        let lowered = input.to_lowercase();

        for rule in &self.rules {
            if rule.needles.iter().any(|needle| lowered.contains(needle)) {
                debug!(needles = ?rule.needles, "reply rule matched");
                return match &rule.reply {
                    Reply::Fixed(text) => text.clone(),
                    Reply::CurrentTime => {
                        let now = chrono::Local::now();
                        format!("The current time is {}.", now.format("%I:%M %p"))
                    }
                    Reply::Joke => {
                        let mut rng = rand::thread_rng();
                        JOKES
                            .choose(&mut rng)
                            .map(|joke| (*joke).to_string())
                            .unwrap_or_else(|| self.fallback.clone())
                    }
                };
            }
        }

        debug!("no reply rule matched, using fallback");
        self.fallback.clone()
    }
}

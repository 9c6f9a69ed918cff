//! # lockstep-eightball
//!
//! A Magic 8-Ball question/answer service demonstrating the lockstep
//! transport. The transport is an opaque reliable byte channel; the text
//! conventions here — including the literal shutdown command — are purely an
//! application-level agreement between the two binaries.

use rand::{Rng, RngExt};

/// The classic twenty answers.
pub const RESPONSES: [&str; 20] = [
    "Yes, definitely.",
    "It is certain.",
    "Without a doubt.",
    "Yes.",
    "Most likely.",
    "Outlook good.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
    "Absolutely!",
    "No way!",
    "Maybe, maybe not.",
];

/// Question text that asks the server to shut down.
pub const SHUTDOWN_COMMAND: &str = "kill";

/// Input that quits the interactive client.
pub const EXIT_COMMAND: &str = "exit";

/// Draw one of the twenty answers.
pub fn random_reply(rng: &mut impl Rng) -> &'static str {
    RESPONSES[rng.random_range(0..RESPONSES.len())]
}

/// A study topic offered as a one-command shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub name: &'static str,
    pub prompt: &'static str,
}

pub const TOPICS: &[Topic] = &[
    Topic {
        name: "Qubits",
        prompt: "Explain what qubits are in simple terms.",
    },
    Topic {
        name: "Superposition",
        prompt: "What is quantum superposition?",
    },
    Topic {
        name: "Entanglement",
        prompt: "Explain quantum entanglement with an example.",
    },
    Topic {
        name: "Algorithms",
        prompt: "What are some common quantum algorithms?",
    },
    Topic {
        name: "Computers",
        prompt: "How do quantum computers differ from classical computers?",
    },
];

/// Shown while the conversation holds only the welcome message.
pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "What is quantum computing?",
    "How does quantum superposition work?",
    "What are the practical applications of quantum computing?",
    "Can you explain quantum teleportation?",
];

/// Looks up a topic by its 1-based position in `/topics`.
pub fn topic_by_number(number: usize) -> Option<&'static Topic> {
    number.checked_sub(1).and_then(|index| TOPICS.get(index))
}

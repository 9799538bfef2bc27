//! Prompt-ready rendering of retrieved bullets.

use crate::bullet::Bullet;
use crate::retrieve::RetrieveOptions;
use crate::store::AceMemory;

pub const CONTEXT_HEADER: &str = "=== Relevant Strategies and Lessons ===";
const RULE_WIDTH: usize = 50;

/// Numbered `[+h/-x]` list between the header and a `=` rule; "" when empty.
pub fn format_context(bullets: &[Bullet]) -> String {
    if bullets.is_empty() {
        return String::new();
    }
    let mut lines = Vec::with_capacity(bullets.len() + 2);
    lines.push(CONTEXT_HEADER.to_string());
    for (i, bullet) in bullets.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, bullet.format_for_prompt()));
    }
    lines.push("=".repeat(RULE_WIDTH));
    lines.join("\n")
}

impl AceMemory {
    /// Retrieve for `query` and render the result for prompt injection.
    pub fn render_context(
        &mut self,
        query: &str,
        top_k: usize,
        options: &RetrieveOptions,
    ) -> String {
        let bullets = self.retrieve(query, top_k, options);
        format_context(&bullets)
    }
}

//! Shared UI icons and emojis.
//!
//! Each icon carries a plain-text fallback for terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("\u{2705} ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("\u{274C} ", "[ERR] ");
pub static SPARKLE: Emoji<'_, '_> = Emoji("\u{2728} ", "* ");
pub static WARN: Emoji<'_, '_> = Emoji("\u{26A0}\u{FE0F}  ", "[WARN] ");

// Run indicators
pub static ROCKET: Emoji<'_, '_> = Emoji("\u{1F680} ", ">> ");
pub static AGENT: Emoji<'_, '_> = Emoji("\u{1F916} ", "[agent] ");
pub static THINKING: Emoji<'_, '_> = Emoji("\u{1F4AD} ", "... ");
pub static LOCK: Emoji<'_, '_> = Emoji("\u{1F512} ", "[deny] ");
pub static KEY: Emoji<'_, '_> = Emoji("\u{1F511} ", "[allow] ");
pub static COST: Emoji<'_, '_> = Emoji("\u{1F4B0} ", "$ ");
pub static SEARCH: Emoji<'_, '_> = Emoji("\u{1F50D} ", "[verify] ");
pub static SUMMARY: Emoji<'_, '_> = Emoji("\u{1F4CA} ", "[summary] ");
pub static LINK: Emoji<'_, '_> = Emoji("\u{1F517} ", "[call] ");
pub static FOLDER: Emoji<'_, '_> = Emoji("\u{1F4C1} ", "");

use serde::{Deserialize, Serialize};

use crate::browser::Selector;

/// Selector vocabulary and thresholds for content extraction.
///
/// Every list is tried in order; the first selector producing a usable
/// value wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub title: Vec<Selector>,
    pub description: Vec<Selector>,

    pub objective_containers: Vec<Selector>,
    pub objective_items: Selector,

    pub instruction_containers: Vec<Selector>,
    pub instruction_items: Selector,

    pub prerequisite_containers: Vec<Selector>,
    pub prerequisite_items: Selector,

    /// Main content area; the whole document when none is visible
    pub content_containers: Vec<Selector>,

    pub lesson_links: Vec<Selector>,
    pub time_estimate: Vec<Selector>,
    pub difficulty: Vec<Selector>,

    pub trail_title: Vec<Selector>,
    pub trail_description: Vec<Selector>,
    pub module_cards: Selector,

    /// Link targets worth keeping besides site-relative ones
    pub related_domains: Vec<String>,

    /// Substring every module or lesson URL contains (default: modules)
    pub module_path_marker: String,

    /// Lesson link labels that are status badges rather than titles
    pub generic_lesson_titles: Vec<String>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            title: Selector::parse_all(&[
                "h1",
                "[data-testid='lesson-title']",
                "[data-testid='module-title']",
                ".lesson-title",
                ".module-title",
                ".title",
            ]),
            description: Selector::parse_all(&[
                "[data-testid='module-description']",
                ".module-description",
                ".description",
                ".module-intro",
                "p:first-of-type",
            ]),
            objective_containers: Selector::parse_all(&[
                "[data-testid='learning-objectives']",
                ".learning-objectives",
                ".objectives",
                ".learning-goals",
            ]),
            objective_items: Selector::parse("li, .objective-item, .goal-item"),
            instruction_containers: Selector::parse_all(&[
                "[data-testid='instructions']",
                ".instructions",
                ".steps",
                ".procedure",
                ".how-to",
            ]),
            instruction_items: Selector::parse("li, .step, .instruction-step"),
            prerequisite_containers: Selector::parse_all(&[
                "[data-testid='prerequisites']",
                ".prerequisites",
                ".requirements",
                ".pre-requisites",
            ]),
            prerequisite_items: Selector::parse("li, .prerequisite-item"),
            content_containers: Selector::parse_all(&[
                "[data-testid='lesson-content']",
                ".lesson-content",
                ".content",
                ".main-content",
                "main",
                ".lesson-body",
            ]),
            lesson_links: Selector::parse_all(&[
                "[data-testid='lesson-link']",
                ".lesson-link",
                ".lesson-item a",
                ".module-lessons a",
                "a[href*='/content/learn/modules/']",
            ]),
            time_estimate: Selector::parse_all(&[
                "[data-testid='time-estimate']",
                ".time-estimate",
                ".duration",
                ".estimated-time",
            ]),
            difficulty: Selector::parse_all(&[
                "[data-testid='difficulty']",
                ".difficulty",
                ".level",
                ".skill-level",
            ]),
            trail_title: Selector::parse_all(&[
                "[data-testid='trail-title']",
                ".trail-title",
                "h1",
                ".trail-header h1",
            ]),
            trail_description: Selector::parse_all(&[
                "[data-testid='trail-description']",
                ".trail-description",
                ".trail-intro",
                "p:first-of-type",
            ]),
            module_cards: Selector::parse("[data-testid='module-card'], .module-card, .trail-module"),
            related_domains: [
                "trailhead.salesforce.com",
                "developer.salesforce.com",
                "help.salesforce.com",
                "salesforce.com/products",
                "github.com",
                "docs.salesforce.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            module_path_marker: "modules".to_string(),
            generic_lesson_titles: ["start", "complete", "incomplete"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

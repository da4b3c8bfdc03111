//! Append-only, deduplicating stylesheet.
//!
//! Rules live in cascade groups. Each group starts with a marker rule
//! (`[stylesheet-group="N"]{}`) and groups are laid out in ascending order,
//! so a rule's position is decided by its group rather than by when it was
//! inserted. The same layout is used for text output and for a live
//! [`CssRuleTarget`], which keeps server output and client insertions aligned.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::compiler::{CascadeOrder, Rule};
use crate::error::Result;

/// Default id of the backing `<style>` element.
pub const DEFAULT_SHEET_ID: &str = "strata-stylesheet";

/// Configuration for a [`RuleSheet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    pub id: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_SHEET_ID.to_string(),
        }
    }
}

/// A live stylesheet that rules are mirrored into (a `CSSStyleSheet`).
pub trait CssRuleTarget {
    /// Insert `text` at absolute rule `index`.
    fn insert_rule(&mut self, text: &str, index: usize) -> Result<()>;
}

/// Text snapshot of a sheet for server-rendered `<style>` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub id: String,
    pub text: String,
}

/// Ordered, deduplicating rule store.
pub struct RuleSheet {
    id: String,
    groups: BTreeMap<u32, Vec<String>>,
    ids: HashSet<String>,
    texts: HashSet<String>,
    target: Option<Box<dyn CssRuleTarget>>,
    /// Rules per group the live target accepted. Rejected rules stay in the
    /// text model but take no index in the target.
    live: BTreeMap<u32, usize>,
}

impl fmt::Debug for RuleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSheet")
            .field("id", &self.id)
            .field("groups", &self.groups.len())
            .field("rules", &self.texts.len())
            .field("live", &self.target.is_some())
            .finish()
    }
}

impl Default for RuleSheet {
    fn default() -> Self {
        Self::new(SheetConfig::default())
    }
}

impl RuleSheet {
    /// Create an empty sheet in text-accumulation mode.
    pub fn new(config: SheetConfig) -> Self {
        Self {
            id: config.id,
            groups: BTreeMap::new(),
            ids: HashSet::new(),
            texts: HashSet::new(),
            target: None,
            live: BTreeMap::new(),
        }
    }

    /// Create a sheet seeded from server-rendered text.
    ///
    /// Group markers and rule lines are read back so that hydrated rules are
    /// not inserted a second time.
    pub fn hydrate(config: SheetConfig, text: &str) -> Self {
        let mut sheet = Self::new(config);
        let mut group: Option<u32> = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(n) = parse_marker(line) {
                group = Some(n);
                sheet.groups.entry(n).or_insert_with(|| vec![line.to_string()]);
                continue;
            }
            let n = group.unwrap_or(CascadeOrder::Atomic.group());
            let rules = sheet
                .groups
                .entry(n)
                .or_insert_with(|| vec![group_marker(n)]);
            if sheet.texts.insert(line.to_string()) {
                rules.push(line.to_string());
                if let Some(id) = selector_class(line) {
                    sheet.ids.insert(id.to_string());
                }
            }
        }

        log::debug!(
            "hydrated sheet {:?} with {} rules in {} groups",
            sheet.id,
            sheet.texts.len(),
            sheet.groups.len()
        );
        sheet
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attach a live target and replay every existing rule into it.
    pub fn attach_target(&mut self, mut target: Box<dyn CssRuleTarget>) {
        self.live.clear();
        let mut index = 0;
        for (&group, rules) in &self.groups {
            for text in rules {
                match target.insert_rule(text, index) {
                    Ok(()) => {
                        index += 1;
                        *self.live.entry(group).or_default() += 1;
                    }
                    Err(e) => {
                        log::warn!("failed to replay rule into live sheet {:?}: {e}", self.id)
                    }
                }
            }
        }
        self.target = Some(target);
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Insert a rule unless its identifier is already present.
    ///
    /// Returns whether anything was inserted.
    pub fn insert(&mut self, rule: &Rule) -> bool {
        if !self.ids.insert(rule.id.clone()) {
            return false;
        }
        let group = rule.order.group();
        let mut inserted = false;
        for text in &rule.texts {
            inserted |= self.insert_text(text, group);
        }
        inserted
    }

    /// Insert raw rule text into a group unless the same text is present.
    pub fn insert_text(&mut self, text: &str, group: u32) -> bool {
        if self.texts.contains(text) {
            return false;
        }

        if !self.groups.contains_key(&group) {
            let marker = group_marker(group);
            self.mirror(&marker, group);
            self.groups.insert(group, vec![marker]);
        }

        self.mirror(text, group);
        self.groups.entry(group).or_default().push(text.to_string());
        self.texts.insert(text.to_string());
        true
    }

    /// Append `text` to the end of `group` in the live target.
    fn mirror(&mut self, text: &str, group: u32) {
        let Some(target) = self.target.as_mut() else {
            return;
        };
        let index = self.live.range(..=group).map(|(_, n)| n).sum();
        match target.insert_rule(text, index) {
            Ok(()) => *self.live.entry(group).or_default() += 1,
            Err(e) => log::warn!("failed to insert rule into live sheet: {e}: {text}"),
        }
    }

    /// Number of rules, markers excluded.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Serialize the sheet in cascade order.
    pub fn get_text(&self) -> String {
        self.groups
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn snapshot(&self) -> SheetSnapshot {
        SheetSnapshot {
            id: self.id.clone(),
            text: self.get_text(),
        }
    }
}

fn group_marker(group: u32) -> String {
    format!("[stylesheet-group=\"{group}\"]{{}}")
}

fn parse_marker(line: &str) -> Option<u32> {
    line.strip_prefix("[stylesheet-group=\"")?
        .strip_suffix("\"]{}")?
        .parse()
        .ok()
}

/// First class name of a rule's selector (`.r-color-1x2y{...}` -> `r-color-1x2y`).
fn selector_class(rule: &str) -> Option<&str> {
    let rest = rule.strip_prefix('.')?;
    let end = rest.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::Error;

    fn rule(id: &str, order: CascadeOrder) -> Rule {
        Rule {
            id: id.to_string(),
            order,
            texts: vec![format!(".{id}{{color:red;}}")],
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        rules: Rc<RefCell<Vec<String>>>,
        fail: bool,
        reject: Option<&'static str>,
    }

    impl CssRuleTarget for Recorder {
        fn insert_rule(&mut self, text: &str, index: usize) -> Result<()> {
            if self.fail || self.reject.is_some_and(|r| text.contains(r)) {
                return Err(Error::RuleInsert("unsupported selector".to_string()));
            }
            let mut rules = self.rules.borrow_mut();
            if index > rules.len() {
                return Err(Error::RuleInsert(format!("index {index} out of bounds")));
            }
            rules.insert(index, text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut sheet = RuleSheet::default();
        let r = rule("r-a", CascadeOrder::Atomic);
        assert!(sheet.insert(&r));
        let once = sheet.get_text();
        for _ in 0..5 {
            assert!(!sheet.insert(&r));
        }
        assert_eq!(sheet.get_text(), once);
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_groups_ordered_regardless_of_insertion() {
        let mut sheet = RuleSheet::default();
        sheet.insert(&rule("r-late", CascadeOrder::Atomic));
        sheet.insert(&rule("r-early", CascadeOrder::Shorthand));
        assert_eq!(
            sheet.get_text(),
            "[stylesheet-group=\"20\"]{}\n.r-early{color:red;}\n[stylesheet-group=\"30\"]{}\n.r-late{color:red;}"
        );
    }

    #[test]
    fn test_live_target_matches_text() {
        let recorder = Recorder::default();
        let mut sheet = RuleSheet::default();
        sheet.attach_target(Box::new(recorder.clone()));
        sheet.insert(&rule("r-c", CascadeOrder::Atomic));
        sheet.insert(&rule("r-a", CascadeOrder::Reset));
        sheet.insert(&rule("r-b", CascadeOrder::LogicalLonghand));
        assert_eq!(recorder.rules.borrow().join("\n"), sheet.get_text());
    }

    #[test]
    fn test_attach_replays_existing_rules() {
        let mut sheet = RuleSheet::default();
        sheet.insert(&rule("r-a", CascadeOrder::Atomic));
        let recorder = Recorder::default();
        sheet.attach_target(Box::new(recorder.clone()));
        assert_eq!(recorder.rules.borrow().len(), 2);
    }

    #[test]
    fn test_target_failure_keeps_text() {
        let mut sheet = RuleSheet::default();
        sheet.attach_target(Box::new(Recorder {
            fail: true,
            ..Recorder::default()
        }));
        assert!(sheet.insert(&rule("r-a", CascadeOrder::Atomic)));
        assert!(sheet.get_text().contains(".r-a{color:red;}"));
    }

    #[test]
    fn test_rejected_rule_takes_no_live_index() {
        let recorder = Recorder {
            reject: Some("r-bad"),
            ..Recorder::default()
        };
        let mut sheet = RuleSheet::default();
        sheet.attach_target(Box::new(recorder.clone()));
        sheet.insert(&rule("r-bad", CascadeOrder::Shorthand));
        sheet.insert(&rule("r-a", CascadeOrder::Atomic));
        sheet.insert(&rule("r-b", CascadeOrder::Shorthand));
        sheet.insert(&rule("r-c", CascadeOrder::Atomic));

        let expected: Vec<String> = sheet
            .get_text()
            .lines()
            .filter(|line| !line.contains("r-bad"))
            .map(str::to_string)
            .collect();
        assert_eq!(*recorder.rules.borrow(), expected);
        assert!(sheet.get_text().contains(".r-bad{color:red;}"));

        // Replaying into a fresh target skips the rejected rule the same way.
        let replay = Recorder {
            reject: Some("r-bad"),
            ..Recorder::default()
        };
        sheet.attach_target(Box::new(replay.clone()));
        sheet.insert(&rule("r-d", CascadeOrder::Shorthand));
        let expected: Vec<String> = sheet
            .get_text()
            .lines()
            .filter(|line| !line.contains("r-bad"))
            .map(str::to_string)
            .collect();
        assert_eq!(*replay.rules.borrow(), expected);
    }

    #[test]
    fn test_hydrate_round_trip() {
        let mut server = RuleSheet::default();
        server.insert(&rule("r-a", CascadeOrder::Atomic));
        server.insert(&rule("r-b", CascadeOrder::PhysicalLonghand));

        let mut client = RuleSheet::hydrate(SheetConfig::default(), &server.get_text());
        assert!(client.contains("r-a"));
        assert!(!client.insert(&rule("r-b", CascadeOrder::PhysicalLonghand)));
        assert_eq!(client.get_text(), server.get_text());

        client.insert(&rule("r-c", CascadeOrder::Atomic));
        assert!(client.get_text().ends_with(".r-c{color:red;}"));
    }

    #[test]
    fn test_snapshot_id() {
        let sheet = RuleSheet::new(SheetConfig {
            id: "app".to_string(),
        });
        let snapshot = sheet.snapshot();
        assert_eq!(snapshot.id, "app");
        assert!(snapshot.text.is_empty());
    }
}

//! Style compilation contexts.
//!
//! A [`StyleContext`] owns everything one render root needs: the rule
//! compiler and its cache, the registry of created styles, and the rule
//! sheet. Independent roots use independent contexts so their cascades never
//! interfere. [`StyleSheet`] wraps a per-thread default context for callers
//! that only ever render one root.

use std::cell::RefCell;
use std::collections::HashMap;

use super::compiler::{CascadeOrder, CompiledStyle, Compiler};
use super::options::StyleOptions;
use super::preprocess::preprocess;
use super::resolve::{Layer, ResolvedStyle, StyleInput, resolve_layers};
use super::sheet::{CssRuleTarget, RuleSheet, SheetConfig, SheetSnapshot};
use super::value::Style;
use crate::error::{Error, Result};
use crate::util::warn_once;

/// Handle to a style registered with [`StyleContext::create`].
///
/// Released slots are reused; a handle only matches the registration that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleRef {
    index: u32,
    generation: u32,
}

impl StyleRef {
    pub fn index(self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
struct Registered {
    source: Style,
    compiled: CompiledStyle,
}

#[derive(Debug, Default)]
struct Entry {
    generation: u32,
    style: Option<Registered>,
}

/// Compilation context for one render root.
#[derive(Debug)]
pub struct StyleContext {
    compiler: Compiler,
    sheet: RuleSheet,
    registry: Vec<Entry>,
    free: Vec<u32>,
    resolved: HashMap<(Vec<StyleRef>, bool), ResolvedStyle>,
}

impl Default for StyleContext {
    fn default() -> Self {
        Self::new(SheetConfig::default())
    }
}

impl StyleContext {
    pub fn new(config: SheetConfig) -> Self {
        Self::with_sheet(RuleSheet::new(config))
    }

    /// Build a context around an existing (e.g. hydrated) sheet.
    pub fn with_sheet(sheet: RuleSheet) -> Self {
        Self {
            compiler: Compiler::new(),
            sheet,
            registry: Vec::new(),
            free: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    /// Mirror every rule into a live stylesheet from now on.
    pub fn attach_target(&mut self, target: Box<dyn CssRuleTarget>) {
        self.sheet.attach_target(target);
    }

    /// Register named styles, compiling and inserting their rules.
    ///
    /// Names containing `$raw` compile into a single reset-group class named
    /// after the part before `$raw` instead of atomic rules.
    pub fn create<K, I>(&mut self, styles: I) -> Vec<(String, StyleRef)>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Style)>,
    {
        styles
            .into_iter()
            .map(|(name, style)| {
                let name = name.into();
                let handle = match name.split_once("$raw") {
                    Some((prefix, _)) => self.register_classic(style, prefix, CascadeOrder::Reset),
                    None => self.register(style),
                };
                (name, handle)
            })
            .collect()
    }

    /// Register one style with atomic compilation.
    pub fn register(&mut self, style: Style) -> StyleRef {
        let normalized = preprocess(&style, &StyleOptions::default());
        let (compiled, rules) = self.compiler.atomic(&normalized);
        for rule in &rules {
            self.sheet.insert(rule);
        }
        self.push(style, compiled)
    }

    /// Register one style as a single named class in the classic group.
    pub fn classic(&mut self, style: Style, name: &str) -> StyleRef {
        self.register_classic(style, name, CascadeOrder::Classic)
    }

    fn register_classic(&mut self, style: Style, name: &str, order: CascadeOrder) -> StyleRef {
        let normalized = preprocess(&style, &StyleOptions::default());
        let (compiled, rules) = self.compiler.classic(&normalized, name, order);
        for rule in &rules {
            self.sheet.insert(rule);
        }
        self.push(style, compiled)
    }

    fn push(&mut self, source: Style, compiled: CompiledStyle) -> StyleRef {
        let style = Some(Registered { source, compiled });
        if let Some(index) = self.free.pop() {
            let entry = &mut self.registry[index as usize];
            entry.style = style;
            return StyleRef {
                index,
                generation: entry.generation,
            };
        }
        let index = self.registry.len() as u32;
        self.registry.push(Entry {
            generation: 0,
            style,
        });
        StyleRef {
            index,
            generation: 0,
        }
    }

    /// Drop a registered style. Its rules stay in the sheet; its slot and
    /// every memoized resolution naming it are freed.
    pub fn release(&mut self, handle: StyleRef) -> bool {
        if !self.is_registered(handle) {
            return false;
        }
        let entry = &mut self.registry[handle.index as usize];
        entry.style = None;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.resolved.retain(|(handles, _), _| !handles.contains(&handle));
        true
    }

    /// Number of live registrations.
    pub fn registered_len(&self) -> usize {
        self.registry.len() - self.free.len()
    }

    pub fn is_registered(&self, handle: StyleRef) -> bool {
        self.entry(handle).is_some()
    }

    fn entry(&self, handle: StyleRef) -> Option<&Registered> {
        self.registry
            .get(handle.index as usize)
            .filter(|entry| entry.generation == handle.generation)
            .and_then(|entry| entry.style.as_ref())
    }

    /// The source object a handle was created from.
    pub fn source(&self, handle: StyleRef) -> Option<&Style> {
        self.entry(handle).map(|entry| &entry.source)
    }

    pub fn compiled(&self, handle: StyleRef) -> Option<&CompiledStyle> {
        self.entry(handle).map(|entry| &entry.compiled)
    }

    /// Merge all entries into one plain style, left to right.
    pub fn flatten(&self, input: &StyleInput) -> Style {
        let mut out = Style::new();
        input.for_each_leaf(&mut |leaf| match leaf {
            StyleInput::Raw(style) => out.assign(style),
            StyleInput::Compiled(handle) => match self.source(*handle) {
                Some(source) => out.assign(source),
                None => warn_unknown(*handle),
            },
            StyleInput::None | StyleInput::List(_) => {}
        });
        out
    }

    /// Resolve a style input into a class name and inline style.
    ///
    /// Inputs made only of registered handles are memoized per direction.
    pub fn resolve(&mut self, input: &StyleInput, options: &StyleOptions) -> ResolvedStyle {
        let mut handles = Vec::new();
        let mut has_raw = false;
        input.for_each_leaf(&mut |leaf| match leaf {
            StyleInput::Compiled(handle) => handles.push(*handle),
            StyleInput::Raw(_) => has_raw = true,
            StyleInput::None | StyleInput::List(_) => {}
        });

        let key = (handles, options.is_rtl());
        if !has_raw && let Some(hit) = self.resolved.get(&key) {
            return hit.clone();
        }

        let mut layers = Vec::new();
        let mut unknown = false;
        input.for_each_leaf(&mut |leaf| match leaf {
            StyleInput::Compiled(handle) => match self.compiled(*handle) {
                Some(compiled) => layers.push(Layer::Compiled(compiled)),
                None => {
                    unknown = true;
                    warn_unknown(*handle);
                }
            },
            StyleInput::Raw(style) => layers.push(Layer::Raw(style)),
            StyleInput::None | StyleInput::List(_) => {}
        });

        let resolved = resolve_layers(&layers, options);
        if !has_raw && !unknown {
            self.resolved.insert(key, resolved.clone());
        }
        resolved
    }

    pub fn sheet(&self) -> &RuleSheet {
        &self.sheet
    }

    pub fn sheet_snapshot(&self) -> SheetSnapshot {
        self.sheet.snapshot()
    }
}

fn warn_unknown(handle: StyleRef) {
    warn_once(&format!("style-ref:{}", handle.index), || {
        format!("Ignoring unregistered style handle {}", handle.index)
    });
}

/// Combine two styles; either may be empty.
pub fn compose(a: StyleInput, b: StyleInput) -> StyleInput {
    match (a.is_none(), b.is_none()) {
        (false, false) => StyleInput::List(vec![a, b]),
        (false, true) => a,
        _ => b,
    }
}

/// [`compose`] for callers holding an argument list.
pub fn try_compose(styles: Vec<StyleInput>) -> Result<StyleInput> {
    let count = styles.len();
    let mut iter = styles.into_iter();
    match (iter.next(), iter.next(), iter.next()) {
        (Some(a), Some(b), None) => Ok(compose(a, b)),
        _ => Err(Error::ComposeArity(count)),
    }
}

// ============================================================================
// Default sheet
// ============================================================================

struct DefaultSheet {
    context: StyleContext,
    absolute_fill: StyleRef,
}

impl DefaultSheet {
    fn new() -> Self {
        let mut context = StyleContext::default();
        let absolute_fill = context.register(absolute_fill_object());
        Self {
            context,
            absolute_fill,
        }
    }
}

thread_local! {
    static DEFAULT: RefCell<DefaultSheet> = RefCell::new(DefaultSheet::new());
}

fn absolute_fill_object() -> Style {
    Style::new()
        .with("position", "absolute")
        .with("left", 0)
        .with("right", 0)
        .with("top", 0)
        .with("bottom", 0)
}

/// Convenience API over a per-thread default [`StyleContext`].
pub struct StyleSheet;

impl StyleSheet {
    /// Width of the thinnest line the platform renders.
    pub const HAIRLINE_WIDTH: f64 = 1.0;

    pub fn create<K, I>(styles: I) -> Vec<(String, StyleRef)>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Style)>,
    {
        Self::with_context(|context| context.create(styles))
    }

    pub fn compose(a: StyleInput, b: StyleInput) -> StyleInput {
        compose(a, b)
    }

    pub fn flatten(input: &StyleInput) -> Style {
        Self::with_context(|context| context.flatten(input))
    }

    pub fn resolve(input: &StyleInput, options: &StyleOptions) -> ResolvedStyle {
        Self::with_context(|context| context.resolve(input, options))
    }

    pub fn sheet() -> SheetSnapshot {
        Self::with_context(|context| context.sheet_snapshot())
    }

    /// Registered `position: absolute` style filling its parent.
    pub fn absolute_fill() -> StyleRef {
        DEFAULT.with(|default| default.borrow().absolute_fill)
    }

    pub fn absolute_fill_object() -> Style {
        absolute_fill_object()
    }

    /// Run `f` with the default context.
    pub fn with_context<R>(f: impl FnOnce(&mut StyleContext) -> R) -> R {
        DEFAULT.with(|default| f(&mut default.borrow_mut().context))
    }
}

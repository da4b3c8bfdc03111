//! WASM bindings for in-browser style compilation.
//!
//! This module exposes a style context to JavaScript via wasm-bindgen. Rules
//! can be mirrored straight into a live `CSSStyleSheet`.

use indexmap::IndexMap;
use js_sys::{Function, Object, Reflect};
use wasm_bindgen::prelude::*;

use crate::error::{Error, Result};
use crate::style::{
    CssRuleTarget, SheetConfig, StyleContext, StyleInput, StyleOptions, StyleRef, WritingDirection,
};
use crate::Style;

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// A `CSSStyleSheet` reached through `insertRule`.
struct JsSheet {
    sheet: JsValue,
}

impl CssRuleTarget for JsSheet {
    fn insert_rule(&mut self, text: &str, index: usize) -> Result<()> {
        let insert = Reflect::get(&self.sheet, &JsValue::from_str("insertRule"))
            .map_err(|e| Error::RuleInsert(format!("{e:?}")))?;
        let insert: Function = insert
            .dyn_into()
            .map_err(|_| Error::RuleInsert("insertRule is not a function".to_string()))?;
        insert
            .call2(&self.sheet, &JsValue::from_str(text), &JsValue::from_f64(index as f64))
            .map_err(|e| Error::RuleInsert(format!("{e:?}")))?;
        Ok(())
    }
}

/// Style compilation context for one render root.
#[wasm_bindgen]
pub struct StyleEngine {
    context: StyleContext,
    names: IndexMap<String, StyleRef>,
}

#[wasm_bindgen]
impl StyleEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(sheet_id: Option<String>) -> StyleEngine {
        let config = match sheet_id {
            Some(id) => SheetConfig { id },
            None => SheetConfig::default(),
        };
        StyleEngine {
            context: StyleContext::new(config),
            names: IndexMap::new(),
        }
    }

    /// Register a JSON object of named styles.
    pub fn create(&mut self, json: &str) -> std::result::Result<(), JsValue> {
        let styles: IndexMap<String, Style> = serde_json::from_str(json).map_err(js_error)?;
        self.names.extend(self.context.create(styles));
        Ok(())
    }

    /// Resolve named styles into `{ className, style }`.
    pub fn resolve(&mut self, names: Vec<String>, rtl: bool) -> std::result::Result<JsValue, JsValue> {
        let mut entries = Vec::with_capacity(names.len());
        for name in &names {
            let handle = self
                .names
                .get(name)
                .ok_or_else(|| js_error(format!("no style named {name:?}")))?;
            entries.push(StyleInput::from(*handle));
        }
        let direction = if rtl {
            WritingDirection::Rtl
        } else {
            WritingDirection::Ltr
        };
        let options = StyleOptions::default().with_direction(direction);
        let resolved = self.context.resolve(&StyleInput::list(entries), &options);

        let out = Object::new();
        Reflect::set(&out, &"className".into(), &resolved.class_name.as_str().into())?;
        let style = Object::new();
        if let Some(inline) = &resolved.inline {
            for (property, value) in inline.iter() {
                Reflect::set(&style, &property.into(), &value.into())?;
            }
        }
        Reflect::set(&out, &"style".into(), &style)?;
        Ok(out.into())
    }

    /// Mirror every rule, present and future, into a `CSSStyleSheet`.
    #[wasm_bindgen(js_name = attachSheet)]
    pub fn attach_sheet(&mut self, sheet: JsValue) {
        self.context.attach_target(Box::new(JsSheet { sheet }));
    }

    /// The full stylesheet text for server rendering.
    #[wasm_bindgen(js_name = sheetText)]
    pub fn sheet_text(&self) -> String {
        self.context.sheet().get_text()
    }

    #[wasm_bindgen(js_name = sheetId)]
    pub fn sheet_id(&self) -> String {
        self.context.sheet().id().to_string()
    }
}

//! JavaScript snippets evaluated inside the Chrome page.

use crate::browser::{ElementHandle, Selector};
use crate::domain::NameValue;

/// Attribute used to address elements between separate script evaluations.
pub const REF_ATTR: &str = "data-trailbuster-ref";

/// Attributes copied into every [`ElementInfo`](crate::browser::ElementInfo).
pub(crate) const CAPTURED_ATTRS: [&str; 7] = ["href", "type", "name", "id", "placeholder", "action", "alt"];

/// Function body applied to an element to trigger a script click.
pub const SCRIPT_CLICK_FN: &str = "function() { this.click(); }";

/// Function body applied to an input before typing into it.
pub const CLEAR_VALUE_FN: &str = "function() { \
    this.focus(); \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

/// Dumps the current origin's local storage as `[{name, value}]`.
pub const LOCAL_STORAGE_DUMP: &str = r#"
    (() => {
        const out = [];
        try {
            for (let i = 0; i < window.localStorage.length; i++) {
                const name = window.localStorage.key(i);
                out.push({ name, value: window.localStorage.getItem(name) });
            }
        } catch (e) {}
        return { origin: window.location.origin, entries: out };
    })()
"#;

/// CSS selector addressing a previously tagged element.
pub fn ref_selector(handle: ElementHandle) -> String {
    format!("[{}=\"{}\"]", REF_ATTR, handle.0)
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Generate JavaScript that finds all matches for `selector` and describes them.
///
/// This JS runs in the browser context and:
/// 1. Resolves the scope element (or the document)
/// 2. Applies the CSS selector and the optional text filter
/// 3. Tags each match with a stable ref attribute
/// 4. Performs a layout-based visibility check
pub fn query_script(selector: &Selector, scope: Option<ElementHandle>) -> String {
    let css = js_string(selector.css());
    let needle = selector
        .has_text()
        .map(|t| js_string(&t.to_lowercase()))
        .unwrap_or_else(|| "null".to_string());
    let scope = scope
        .map(|h| js_string(&ref_selector(h)))
        .unwrap_or_else(|| "null".to_string());
    let attrs = CAPTURED_ATTRS
        .iter()
        .map(|a| js_string(a))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
        (() => {{
            const scopeSelector = {scope};
            const root = scopeSelector === null ? document : document.querySelector(scopeSelector);
            if (!root) {{
                return [];
            }}

            const needle = {needle};
            window.__trailbusterRef = window.__trailbusterRef || 0;

            const isVisible = (el) => {{
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden') {{
                    return false;
                }}
                const rect = el.getBoundingClientRect();
                return el.getClientRects().length > 0 && (rect.width > 0 || rect.height > 0);
            }};

            const out = [];
            for (const el of root.querySelectorAll({css})) {{
                const text = (el.textContent || '').replace(/\s+/g, ' ').trim();
                if (needle !== null && !text.toLowerCase().includes(needle)) {{
                    continue;
                }}

                let ref = el.getAttribute('{REF_ATTR}');
                if (!ref) {{
                    window.__trailbusterRef += 1;
                    ref = String(window.__trailbusterRef);
                    el.setAttribute('{REF_ATTR}', ref);
                }}

                const attrs = {{}};
                for (const name of [{attrs}]) {{
                    const value = el.getAttribute(name);
                    if (value !== null) {{
                        attrs[name] = value;
                    }}
                }}

                out.push({{
                    handle: Number(ref),
                    tag: el.tagName.toLowerCase(),
                    text,
                    visible: isVisible(el),
                    attrs
                }});
            }}
            return out;
        }})()
        "#
    )
}

/// Generate JavaScript that writes `entries` into the current origin's local storage.
pub fn local_storage_restore_script(entries: &[NameValue]) -> String {
    let payload = serde_json::to_string(entries).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
        (() => {{
            const entries = {payload};
            for (const entry of entries) {{
                window.localStorage.setItem(entry.name, entry.value);
            }}
            return entries.length;
        }})()
        "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_script_embeds_selector_and_filter() {
        let script = query_script(&Selector::parse("button:has-text('Log In')"), None);
        assert!(script.contains(r#"querySelectorAll("button")"#));
        assert!(script.contains(r#"const needle = "log in";"#));
        assert!(script.contains("const scopeSelector = null;"));
        assert!(script.contains(REF_ATTR));
    }

    #[test]
    fn test_query_script_escapes_quotes() {
        let script = query_script(&Selector::parse(r#"a[href*="login"]"#), None);
        assert!(script.contains(r#"querySelectorAll("a[href*=\"login\"]")"#));
    }

    #[test]
    fn test_query_script_scoped() {
        let script = query_script(&Selector::parse("li"), Some(ElementHandle(12)));
        assert!(script.contains(r#"data-trailbuster-ref=\"12\""#));
    }

    #[test]
    fn test_ref_selector() {
        assert_eq!(ref_selector(ElementHandle(3)), "[data-trailbuster-ref=\"3\"]");
    }

    #[test]
    fn test_local_storage_restore_script() {
        let script = local_storage_restore_script(&[NameValue {
            name: "token".into(),
            value: "a'b".into(),
        }]);
        assert!(script.contains(r#"[{"name":"token","value":"a'b"}]"#));
    }
}

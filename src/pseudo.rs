//! Pseudo-element materialization.
//!
//! Generated `::before`/`::after` content has no DOM node, so the snapshot
//! would never see it. Before the snapshot is taken, this stage promotes
//! each rendered pseudo into a real `<span>` carrying the resolved text
//! and a copied subset of visual properties, and suppresses the original
//! pseudo so layout is not duplicated. The inserted spans carry a
//! reserved class the extraction rules recognize (bullet markers in
//! particular). Running the script twice is a no-op: processed elements
//! are tagged with a data attribute.

use crate::error::Result;
use crate::surface::Surface;

/// Class marking materialized generated content.
pub const PSEUDO_CLASS: &str = "pseudo-content";

const MATERIALIZE_JS: &str = r#"(function () {
    var CLS = 'pseudo-content';
    var DONE = 'pseudoMaterialized';
    var COPIED = ['position', 'left', 'top', 'right', 'bottom', 'color',
        'font-family', 'font-size', 'font-weight', 'font-style',
        'letter-spacing', 'text-transform', 'margin-right', 'margin-left'];

    if (!document.getElementById('__pseudo_suppress')) {
        var sheet = document.createElement('style');
        sheet.id = '__pseudo_suppress';
        sheet.textContent =
            '[data-pseudo-materialized]::before,' +
            '[data-pseudo-materialized]::after{content:none !important;}';
        document.head.appendChild(sheet);
    }

    var inserted = 0;
    var all = Array.prototype.slice.call(document.body.querySelectorAll('*'));
    for (var i = 0; i < all.length; i++) {
        var el = all[i];
        if (el.classList.contains(CLS) || el.dataset[DONE]) continue;
        var spans = [];
        ['::before', '::after'].forEach(function (which) {
            var cs = getComputedStyle(el, which);
            var content = cs.getPropertyValue('content');
            if (!content || content === 'none' || content === 'normal') return;
            if (cs.display === 'none') return;
            var q = content.charAt(0);
            if (q !== '"' && q !== "'") return;
            var text = content.slice(1, -1);
            if (!text) return;
            var span = document.createElement('span');
            span.className = CLS;
            span.textContent = text;
            for (var p = 0; p < COPIED.length; p++) {
                span.style.setProperty(COPIED[p], cs.getPropertyValue(COPIED[p]));
            }
            spans.push([which, span]);
        });
        // Tag first so the suppression rule applies before the span lays out
        el.dataset[DONE] = '1';
        spans.forEach(function (pair) {
            if (pair[0] === '::before') {
                el.insertBefore(pair[1], el.firstChild);
            } else {
                el.appendChild(pair[1]);
            }
            inserted++;
        });
    }
    return JSON.stringify({ inserted: inserted });
})()"#;

/// Promote rendered pseudo-elements into real nodes on the live document.
/// Must run after load and before the snapshot is taken.
pub async fn materialize(surface: &Surface) -> Result<()> {
    let result = surface.eval(MATERIALIZE_JS).await?;
    if let Some(n) = result.get("inserted").and_then(|v| v.as_u64()) {
        log::debug!("materialized {n} pseudo-element(s)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_idempotent_by_marker() {
        // The guard attribute must be checked before any insertion happens.
        assert!(MATERIALIZE_JS.contains("dataset[DONE]"));
        assert!(MATERIALIZE_JS.contains("content:none !important"));
    }

    #[test]
    fn reserved_class_matches_script() {
        assert!(MATERIALIZE_JS.contains(PSEUDO_CLASS));
    }
}

//! Page-side scripts evaluated through Playwright.
//!
//! Every script is read-only except the overlay pair, which only touches the
//! overlay node it owns.

/// Id of the single highlight node injected into a frame's document
pub const OVERLAY_ID: &str = "__lumi_mapper_overlay__";

/// Snapshot one element into the `RawElement` wire shape (camelCase).
///
/// Form values never leave the page; only their length in code points does.
pub const DESCRIBE_ELEMENT: &str = r#"
(el) => {
  const READ = [
    'id', 'class', 'role', 'type', 'name', 'title', 'href', 'placeholder',
    'autocomplete', 'readonly', 'required', 'inputmode', 'maxlength',
    'contenteditable', 'disabled', 'onclick', 'tabindex',
    'aria-label', 'aria-labelledby', 'aria-describedby', 'aria-disabled',
    'data-testid', 'data-test', 'data-qa', 'data-id', 'data-cy', 'data-e2e'
  ];
  const STABLE = ['data-testid', 'data-test', 'data-qa', 'data-id', 'data-cy', 'data-e2e'];
  const cp = (s) => Array.from(s || '');

  const attributes = {};
  for (const name of READ) {
    if (el.hasAttribute(name)) attributes[name] = el.getAttribute(name) || '';
  }

  const tag = el.tagName.toLowerCase();
  const ce = el.getAttribute('contenteditable');
  let valueLength = 0;
  if (ce === '' || ce === 'true') {
    valueLength = cp(el.textContent).length;
  } else if (tag === 'input' || tag === 'textarea' || tag === 'select') {
    valueLength = cp(el.value).length;
  }

  const r = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  const visible = r.width > 0 && r.height > 0
    && style.visibility !== 'hidden' && style.display !== 'none';

  const ancestry = [];
  for (let node = el; node && node.nodeType === 1; node = node.parentElement) {
    const same = node.parentElement
      ? Array.from(node.parentElement.children).filter((c) => c.tagName === node.tagName)
      : [node];
    const stable = STABLE.find((a) => (node.getAttribute(a) || '') !== '');
    ancestry.unshift({
      tag: node.tagName.toLowerCase(),
      id: node.id || null,
      stableAttr: stable ? [stable, node.getAttribute(stable)] : null,
      nthOfType: same.indexOf(node) + 1,
      ofTypeCount: same.length,
    });
  }

  return {
    tag,
    attributes,
    innerText: cp((el.innerText || '').trim()).slice(0, 200).join(''),
    valueLength,
    visible,
    disabled: el.disabled === true,
    rect: { x: r.x, y: r.y, width: r.width, height: r.height },
    ancestry,
  };
}
"#;

/// Outline an element with a fixed-position box in its own document
pub const DRAW_OVERLAY: &str = r#"
(el) => {
  const id = '__lumi_mapper_overlay__';
  const old = document.getElementById(id);
  if (old) old.remove();
  const r = el.getBoundingClientRect();
  const box = document.createElement('div');
  box.id = id;
  Object.assign(box.style, {
    position: 'fixed',
    left: (r.left - 2) + 'px',
    top: (r.top - 2) + 'px',
    width: (r.width + 4) + 'px',
    height: (r.height + 4) + 'px',
    outline: '2px solid #1e90ff',
    pointerEvents: 'none',
    zIndex: '2147483647',
  });
  (document.body || document.documentElement).appendChild(box);
}
"#;

/// Remove the overlay node, if present
pub const REMOVE_OVERLAY: &str = r#"
() => {
  const old = document.getElementById('__lumi_mapper_overlay__');
  if (old) old.remove();
}
"#;

//! Generated documents for benches and size-dependent tests.

/// `blocks` repetitions of a small, whitespace-heavy HTML fragment wrapped in
/// a page.
pub fn html_blocks(blocks: usize) -> Vec<u8> {
    let mut doc = Vec::with_capacity(blocks * 96 + 64);
    doc.extend_from_slice(b"<!DOCTYPE html>\n<html>\n<body>\n");
    for i in 0..blocks {
        doc.extend_from_slice(
            format!(
                "  <div  class=\"box\" id=b{i}>\n    <span>hello   world</span>  <!-- note -->\n  </div>\n"
            )
            .as_bytes(),
        );
    }
    doc.extend_from_slice(b"</body>\n</html>\n");
    doc
}

pub fn css_rules(rules: usize) -> Vec<u8> {
    let mut doc = Vec::with_capacity(rules * 80);
    for i in 0..rules {
        doc.extend_from_slice(
            format!(
                "/* rule {i} */\n.item-{i} > a:hover ,\n.other {{\n  margin : 0   auto ;\n  color: #{:06x};\n}}\n",
                i * 7919 % 0xFF_FFFF
            )
            .as_bytes(),
        );
    }
    doc
}

pub fn js_lines(lines: usize) -> Vec<u8> {
    let mut doc = Vec::with_capacity(lines * 64);
    for i in 0..lines {
        doc.extend_from_slice(
            format!("var v{i} = compute( {i} , \"s  {i}\" ); // step {i}\n/* gap */\n").as_bytes(),
        );
    }
    doc
}

/// A `<script>` body full of near-misses for `</script`.
pub fn script_near_misses(bytes: usize) -> Vec<u8> {
    let mut doc = Vec::with_capacity(bytes + 32);
    doc.extend_from_slice(b"<script>");
    while doc.len() < bytes {
        doc.extend_from_slice(b"</scri<pt");
    }
    doc.extend_from_slice(b"</script>");
    doc
}

#![no_main]

use fedit_dom::{Document, parse_fragment, parse_fragment_lossy, serialize_children};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    // The lossy parser never fails; whatever it keeps must serialize to
    // markup the strict parser accepts.
    let mut doc = Document::new();
    let frag = parse_fragment_lossy(&mut doc, &input);
    let markup = serialize_children(&doc, frag);

    let mut again = Document::new();
    let reparsed = parse_fragment(&mut again, &markup).expect("serialized markup reparses");
    let second = serialize_children(&again, reparsed);

    let mut third_doc = Document::new();
    let third = parse_fragment(&mut third_doc, &second).expect("second pass reparses");
    assert_eq!(
        serialize_children(&third_doc, third),
        second,
        "serialization is not stable after one round trip"
    );

    if let Ok(strict) = parse_fragment(&mut doc, &input) {
        let _ = serialize_children(&doc, strict);
    }
});

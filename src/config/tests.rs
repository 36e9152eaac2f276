// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct Section {
    timeout: u64,
    #[serde(default)]
    nested: Option<Inner>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Inner {
    flag: bool,
}

#[test]
fn test_later_provider_overrides_earlier() {
    let base = PropertiesConfigProvider::new()
        .with_property("interlok.proxy.1", "/a::http://base")
        .with_property("server.host", "127.0.0.1");
    let overlay =
        PropertiesConfigProvider::new().with_property("interlok.proxy.1", "/a::http://overlay");

    let config = Config::builder()
        .with_provider(base)
        .with_provider(overlay)
        .build();

    let entries = config.string_entries("interlok.proxy.").unwrap();
    assert_eq!(entries["1"], "/a::http://overlay");

    let host: String = config.get("server.host").unwrap().unwrap();
    assert_eq!(host, "127.0.0.1");
}

#[test]
fn test_entries_merge_across_providers() {
    let one = PropertiesConfigProvider::new().with_property("interlok.proxy.1", "/a::http://a");
    let two = PropertiesConfigProvider::new().with_property("interlok.proxy.2", "/b::http://b");

    let config = Config::builder().with_provider(one).with_provider(two).build();

    let entries = config.string_entries("interlok.proxy.").unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_string_entries_stringify_scalars() {
    let provider = PropertiesConfigProvider::new()
        .with_value("interlok.proxy.1", json!(8080))
        .with_value("interlok.proxy.2", json!(true));

    let config = Config::builder().with_provider(provider).build();
    let entries = config.string_entries("interlok.proxy.").unwrap();

    assert_eq!(entries["1"], "8080");
    assert_eq!(entries["2"], "true");
}

#[test]
fn test_string_entries_skip_structures() {
    let provider = PropertiesConfigProvider::parse(
        "interlok.proxy.1=/one::http://localhost:5555\n\
         interlok.proxy.2=null\n\
         interlok.proxy.3=[\"/three\", \"http://localhost:5557\"]",
    )
    .unwrap()
    .with_value("interlok.proxy.4", json!({"prefix": "/four"}));

    let config = Config::builder().with_provider(provider).build();
    let entries = config.string_entries("interlok.proxy.").unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries["1"], "/one::http://localhost:5555");
}

#[test]
fn test_section_from_flat_keys() {
    let provider =
        PropertiesConfigProvider::parse("client.timeout=5\nclient.nested.flag=true").unwrap();
    let config = Config::builder().with_provider(provider).build();

    let section: Section = config.section("client").unwrap().unwrap();
    assert_eq!(
        section,
        Section {
            timeout: 5,
            nested: Some(Inner { flag: true })
        }
    );
}

#[test]
fn test_section_from_nested_value() {
    let provider = PropertiesConfigProvider::new().with_value("client", json!({"timeout": 9}));
    let config = Config::builder().with_provider(provider).build();

    let section: Section = config.section("client").unwrap().unwrap();
    assert_eq!(section.timeout, 9);
    assert!(section.nested.is_none());
}

#[test]
fn test_section_missing_and_invalid() {
    let config = Config::builder()
        .with_provider(PropertiesConfigProvider::new().with_property("client.timeout", "soon"))
        .build();

    let missing: Option<Section> = config.section("server").unwrap();
    assert!(missing.is_none());

    let invalid = config.section::<Section>("client").unwrap_err();
    assert!(matches!(invalid, ConfigError::ParseError(_)));
}

#[test]
fn test_flatten_and_select() {
    let mut flat = BTreeMap::new();
    flatten_into(
        "interlok",
        &json!({"proxy": {"1": "/a::http://a", "2": "/b::http://b"}, "other": 1}),
        &mut flat,
    );

    assert_eq!(flat.len(), 3);
    let selected = select_prefixed("interlok.proxy.", &flat);
    assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["1", "2"]);
}

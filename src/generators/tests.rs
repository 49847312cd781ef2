//! Tests for generators module

use super::*;
use crate::error::Error;
use crate::types::{RedirectFilter, SortDirection};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn titles(items: &[crate::types::RawItem]) -> Vec<&str> {
    items
        .iter()
        .filter_map(|i| i.get("title").and_then(|t| t.as_str()))
        .collect()
}

// ============================================================================
// Request Building Tests
// ============================================================================

#[test]
fn test_search_request() {
    let params = Search::new("  rust lang ").build_request(25).unwrap();
    assert_eq!(params["action"], "query");
    assert_eq!(params["generator"], "search");
    assert_eq!(params["gsrsearch"], "rust lang");
    assert_eq!(params["gsrlimit"], "25");
    assert!(!params.contains_key("gsrnamespace"));
}

#[test]
fn test_allpages_request() {
    let params = AllPages::new(4)
        .prefix("Sand")
        .redirects(RedirectFilter::NonRedirects)
        .build_request(10)
        .unwrap();
    assert_eq!(params["gapnamespace"], "4");
    assert_eq!(params["gapprefix"], "Sand");
    assert_eq!(params["gapfilterredir"], "nonredirects");
}

#[test]
fn test_backlinks_request_omits_default_filter() {
    let params = Backlinks::new("Foo").namespaces([0]).build_request(5).unwrap();
    assert_eq!(params["gbltitle"], "Foo");
    assert_eq!(params["gblnamespace"], "0");
    assert!(!params.contains_key("gblfilterredir"));
}

#[test_case("Physics", "Category:Physics" ; "adds prefix")]
#[test_case("Category:Physics", "Category:Physics" ; "keeps prefix")]
#[test_case("category:Physics", "category:Physics" ; "keeps lowercase prefix")]
fn test_category_title(input: &str, expected: &str) {
    let params = CategoryMembers::new(input).build_request(10).unwrap();
    assert_eq!(params["gcmtitle"], expected);
}

#[test]
fn test_transcluded_in_request() {
    let params = TranscludedIn::new("Template:Infobox")
        .redirects(RedirectFilter::Redirects)
        .build_request(10)
        .unwrap();
    assert_eq!(params["generator"], "embeddedin");
    assert_eq!(params["geititle"], "Template:Infobox");
    assert_eq!(params["geifilterredir"], "redirects");
}

#[test]
fn test_query_page_request() {
    let params = QueryPage::new("Ancientpages").build_request(10).unwrap();
    assert_eq!(params["gqppage"], "Ancientpages");
}

#[test_case(QueryDescriptor::Search(Search::new("   ")) ; "blank search")]
#[test_case(QueryDescriptor::Backlinks(Backlinks::new("")) ; "blank backlinks")]
#[test_case(QueryDescriptor::CategoryMembers(CategoryMembers::new(" ")) ; "blank category")]
#[test_case(QueryDescriptor::TranscludedIn(TranscludedIn::new("")) ; "blank transclusion")]
#[test_case(QueryDescriptor::QueryPage(QueryPage::new("")) ; "blank query page")]
#[test_case(QueryDescriptor::Revisions(Revisions::default()) ; "revisions without page")]
fn test_empty_required_filter_fails_fast(descriptor: QueryDescriptor) {
    assert!(matches!(
        descriptor.build_request(10),
        Err(Error::InvalidRequest { .. })
    ));
}

// ============================================================================
// Revisions Tests
// ============================================================================

#[test]
fn test_revisions_request() {
    let params = Revisions::of_title("Foo")
        .direction(SortDirection::Newer)
        .range(Some(10), Some(20))
        .user("Alice")
        .build_request(100)
        .unwrap();
    assert_eq!(params["prop"], "revisions");
    assert_eq!(params["titles"], "Foo");
    assert_eq!(params["rvdir"], "newer");
    assert_eq!(params["rvstartid"], "10");
    assert_eq!(params["rvendid"], "20");
    assert_eq!(params["rvuser"], "Alice");
    assert_eq!(params["rvlimit"], "100");
    assert!(!params.contains_key("rvslots"));
}

#[test]
fn test_revisions_content_caps_limit() {
    let params = Revisions::of_page_id(7)
        .with_content()
        .build_request(500)
        .unwrap();
    assert_eq!(params["pageids"], "7");
    assert_eq!(params["rvlimit"], "50");
    assert_eq!(params["rvslots"], "main");
    assert!(params["rvprop"].ends_with("|content"));
}

#[test_case(Revisions::of_title("Foo").user("A").exclude_user("B") ; "user and exclude")]
#[test_case(Revisions::of_title("Foo").range(Some(10), Some(20)) ; "older wants descending ids")]
#[test_case(Revisions::of_title("Foo").direction(SortDirection::Newer).range(Some(20), Some(10)) ; "newer wants ascending ids")]
#[test_case(Revisions { title: Some("Foo".into()), page_id: Some(1), ..Revisions::default() } ; "title and id")]
fn test_revisions_invalid(generator: Revisions) {
    assert!(matches!(
        generator.build_request(10),
        Err(Error::InvalidRequest { .. })
    ));
}

#[test]
fn test_revisions_parse_splits_one_item_per_revision() {
    let response = json!({
        "query": {"pages": [{
            "pageid": 1, "ns": 0, "title": "Foo",
            "revisions": [{"revid": 3}, {"revid": 2}]
        }]}
    });
    let items = Revisions::of_title("Foo").parse_page(&response).unwrap();
    assert_eq!(items.len(), 2);
    for item in &items {
        assert_eq!(item["title"], "Foo");
        assert_eq!(item["revisions"].as_array().map(Vec::len), Some(1));
    }
    assert_eq!(items[1]["revisions"][0]["revid"], 2);
}

#[test]
fn test_revisions_parse_missing_page() {
    let response = json!({"query": {"pages": [{"ns": 0, "title": "Nope", "missing": true}]}});
    let items = Revisions::of_title("Nope").parse_page(&response).unwrap();
    assert_eq!(items.len(), 1);
    assert!(!items[0].contains_key("revisions"));
}

// ============================================================================
// Response Parsing Tests
// ============================================================================

#[test]
fn test_query_pages_sorted_by_index() {
    let response = json!({
        "query": {"pages": [
            {"pageid": 3, "title": "C", "index": 3},
            {"pageid": 1, "title": "A", "index": 1},
            {"pageid": 2, "title": "B", "index": 2}
        ]}
    });
    let items = query_pages(&response).unwrap();
    assert_eq!(titles(&items), vec!["A", "B", "C"]);
}

#[test]
fn test_query_pages_map_form() {
    let response = json!({
        "query": {"pages": {
            "20": {"pageid": 20, "title": "Second", "index": 2},
            "10": {"pageid": 10, "title": "First", "index": 1}
        }}
    });
    let items = query_pages(&response).unwrap();
    assert_eq!(titles(&items), vec!["First", "Second"]);
}

#[test]
fn test_query_pages_without_index_keep_order() {
    let response = json!({
        "query": {"pages": [{"title": "Zed"}, {"title": "Alpha"}]}
    });
    assert_eq!(titles(&query_pages(&response).unwrap()), vec!["Zed", "Alpha"]);
}

#[test]
fn test_query_pages_empty_response() {
    assert!(query_pages(&json!({"batchcomplete": true})).unwrap().is_empty());
}

#[test]
fn test_query_pages_rejects_scalar() {
    let result = query_pages(&json!({"query": {"pages": 5}}));
    assert!(matches!(result, Err(Error::Decode { .. })));
}

// ============================================================================
// Descriptor Tests
// ============================================================================

#[test]
fn test_descriptor_from_json() {
    let descriptor: QueryDescriptor = serde_json::from_value(json!({
        "type": "category_members",
        "title": "Physics",
        "namespaces": [0, 14]
    }))
    .unwrap();

    assert_eq!(
        descriptor,
        QueryDescriptor::CategoryMembers(CategoryMembers::new("Physics").namespaces([0, 14]))
    );
    assert_eq!(descriptor.name(), "categorymembers");
}

#[test]
fn test_descriptor_from_yaml() {
    let yaml = "type: revisions\ntitle: Foo\ndirection: newer\nfetch_content: true\n";
    let descriptor: QueryDescriptor = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        descriptor,
        Revisions::of_title("Foo")
            .direction(SortDirection::Newer)
            .with_content()
            .into()
    );
}

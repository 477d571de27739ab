use crate::component::{Event, Wrapper};
use crate::config::Config;
use crate::error::{Severity, ERR_MISSING_TEMPLATE, ERR_PARSE, ERR_RECURSION_LIMIT};
use crate::error::{ERR_INITIALIZATION_FAILED, ERR_UNRESOLVED_BINDING, ERR_UNRESOLVED_HANDLER};
use crate::parse::parse_markup;
use crate::registry::Registry;
use crate::scope::Scope;
use crate::templates::TemplateStore;
use crate::test_support::{Broken, Counter, EmptyDiv, Label, MyDiv, MyDivTwo, Page};
use crate::tree::{BindingKind, Node};
use crate::value::Value;
use crate::walker::{WalkOutput, Walker};

fn walk_with(registry: &Registry, templates: &TemplateStore, config: &Config, input: &str) -> WalkOutput {
    let parsed = parse_markup(input);
    assert!(parsed.is_clean(), "unexpected parse errors: {:?}", parsed.errors);
    Walker::new(registry, templates, config).walk(&parsed.tree, &Scope::root())
}

fn walk(registry: &Registry, templates: &TemplateStore, input: &str) -> WalkOutput {
    walk_with(registry, templates, &Config::default(), input)
}

fn basic_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("mydiv", Wrapper::wrap::<MyDiv>().unwrap());
    registry.register("mydivtwo", Wrapper::wrap::<MyDivTwo>().unwrap());
    registry.register("empty-div", Wrapper::wrap::<EmptyDiv>().unwrap());
    registry
}

fn codes(output: &WalkOutput) -> Vec<&str> {
    output.diagnostics.iter().map(|d| d.code.as_str()).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAIN ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_basic_single_div() {
    let out = walk(&Registry::new(), &TemplateStore::new(), "<div></div>");
    assert!(out.is_clean());
    assert_eq!(out.nodes.len(), 1);
    assert_eq!(out.nodes[0].tag(), "div");
    assert!(!out.nodes[0].is_component());
    assert!(out.nodes[0].children().is_empty());
}

#[test]
fn test_basic_nested_plain_elements() {
    let out = walk(
        &Registry::new(),
        &TemplateStore::new(),
        "<div><span></span><a></a></div><section></section>",
    );
    assert!(out.is_clean());
    let tags: Vec<&str> = out.nodes.iter().flat_map(Node::iter).map(Node::tag).collect();
    assert_eq!(tags, vec!["div", "span", "a", "section"]);
}

#[test]
fn test_static_attribute_passthrough() {
    let out = walk(&Registry::new(), &TemplateStore::new(), r#"<div class="box"></div>"#);
    let props = out.nodes[0].properties();
    assert_eq!(props.len(), 1);
    assert_eq!(props[0].key(), "class");
    assert_eq!(props[0].value(), Value::from("box"));
    assert_eq!(props[0].binding(), BindingKind::Static);
}

#[test]
fn test_plain_element_binding_at_root_degrades() {
    let out = walk(&Registry::new(), &TemplateStore::new(), r#"<div :title="Title"></div>"#);
    assert_eq!(codes(&out), vec![ERR_UNRESOLVED_BINDING]);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
    assert!(!out.has_fatal());

    let title = out.nodes[0].property("title").unwrap();
    assert_eq!(title.binding(), BindingKind::Dynamic);
    assert_eq!(title.text(), "Title");
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_basic_component_without_template() {
    let out = walk(&basic_registry(), &TemplateStore::new(), "<mydiv></mydiv>");
    assert!(out.is_clean());
    assert_eq!(out.nodes.len(), 1);

    let node = &out.nodes[0];
    assert!(node.is_component());
    assert!(node.children().is_empty());
    assert!(node.body().is_empty());
    assert_eq!(
        node.instance().unwrap().get("Input"),
        Some(Value::from("MyDiv"))
    );
}

#[test]
fn test_component_tag_keeps_source_casing() {
    let out = walk(&basic_registry(), &TemplateStore::new(), "<MyDiv></MyDiv>");
    assert!(out.is_clean());
    assert_eq!(out.nodes[0].tag(), "MyDiv");
    assert!(out.nodes[0].is_component());
}

#[test]
fn test_each_usage_gets_its_own_instance() {
    let out = walk(&basic_registry(), &TemplateStore::new(), "<mydiv></mydiv><mydiv></mydiv>");
    let first = out.nodes[0].instance().unwrap();
    let second = out.nodes[1].instance().unwrap();
    assert_ne!(first.instance_id(), second.instance_id());

    first.set("Counter", 1i64).unwrap();
    assert_eq!(second.get("Counter"), Some(Value::Int(11)));
}

#[test]
fn test_component_static_and_dynamic_attributes() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        r#"<mydiv class="myclass" :id="Input"></mydiv>"#,
    );
    assert!(out.is_clean());

    let node = &out.nodes[0];
    assert_eq!(node.properties().len(), 2);
    assert_eq!(node.property("class").unwrap().text(), "myclass");

    let id = node.property("id").unwrap();
    assert_eq!(id.binding(), BindingKind::Dynamic);
    assert_eq!(id.value(), Value::from("MyDiv"));
}

#[test]
fn test_template_expands_into_children() {
    let mut registry = basic_registry();
    registry.register_template("mydiv", "mydiv-template");
    let mut templates = TemplateStore::new();
    templates.register("mydiv-template", r#"<div class="inner"></div>"#);

    let out = walk(&registry, &templates, "<mydiv></mydiv>");
    assert!(out.is_clean());

    let node = &out.nodes[0];
    assert_eq!(node.children().len(), 1);
    assert_eq!(node.children()[0].tag(), "div");
    assert!(!node.children()[0].is_component());
    assert!(node.body().is_empty());
}

#[test]
fn test_usage_markup_becomes_body() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        r#"<mydiv><empty-div :class="Input"></empty-div></mydiv>"#,
    );
    assert!(out.is_clean());

    let node = &out.nodes[0];
    assert!(node.children().is_empty());
    assert_eq!(node.body().len(), 1);

    let inner = &node.body()[0];
    assert!(inner.is_component());
    let class = inner.property("class").unwrap();
    assert_eq!(class.binding(), BindingKind::Dynamic);
    assert_eq!(class.value(), Value::from("MyDiv"));
}

#[test]
fn test_nearest_component_wins_in_body() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        r#"<mydiv><mydivtwo><span :title="Input"></span></mydivtwo></mydiv>"#,
    );
    assert!(out.is_clean());
    let span = out.nodes[0].find(&[0, 0]).unwrap();
    assert_eq!(span.tag(), "span");
    assert_eq!(span.property("title").unwrap().value(), Value::from("MyDivTwo"));
}

#[test]
fn test_components_inside_table_select_and_template() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        r#"<table><mydiv :title="Input"></mydiv></table><select><mydivtwo></mydivtwo></select><template><empty-div></empty-div></template>"#,
    );
    assert!(out.is_clean());
    let tags: Vec<&str> = out.nodes.iter().map(Node::tag).collect();
    assert_eq!(tags, vec!["table", "select", "template"]);

    let row = &out.nodes[0].children()[0];
    assert!(row.is_component());
    assert_eq!(row.property("title").unwrap().value(), Value::from("MyDiv"));
    assert_eq!(out.nodes[1].children()[0].tag(), "mydivtwo");
    assert!(out.nodes[2].children()[0].is_component());
}

#[test]
fn test_block_inside_paragraph_stays_nested() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        "<mydiv><p><section></section></p></mydiv>",
    );
    assert!(out.is_clean());
    let body = out.nodes[0].body();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].tag(), "p");
    assert_eq!(body[0].children()[0].tag(), "section");
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROP PASSING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_declared_prop_is_linked_and_synced() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        r#"<mydiv><empty-div :data="Input"></empty-div></mydiv>"#,
    );
    assert!(out.is_clean());

    let inner = &out.nodes[0].body()[0];
    let data = inner.property("data").unwrap();
    assert_eq!(data.binding(), BindingKind::Linked);
    assert_eq!(
        inner.instance().unwrap().get("Data"),
        Some(Value::from("MyDiv"))
    );
}

fn page_registry() -> (Registry, TemplateStore) {
    let mut registry = Registry::new();
    registry.component::<Page>("page", "page").unwrap();
    registry.register("label-box", Wrapper::wrap::<Label>().unwrap());
    let mut templates = TemplateStore::new();
    templates.register("page", r#"<label-box :label="Title"></label-box>"#);
    (registry, templates)
}

#[test]
fn test_parent_field_flows_into_child_prop() {
    let (registry, templates) = page_registry();
    let out = walk(&registry, &templates, "<page></page>");
    assert!(out.is_clean());

    let label = &out.nodes[0].children()[0];
    let attr = label.property("label").unwrap();
    assert_eq!(attr.key(), "label");
    assert_eq!(attr.value(), Value::from("Hello"));
    assert_eq!(attr.binding(), BindingKind::Linked);
    assert_eq!(
        label.instance().unwrap().get("Label"),
        Some(Value::from("Hello"))
    );
}

#[test]
fn test_notify_after_parent_change_resyncs_child() {
    let (registry, templates) = page_registry();
    let out = walk(&registry, &templates, "<page></page>");

    let page = &out.nodes[0];
    page.instance().unwrap().set("Title", "Bye").unwrap();
    let label = page.children()[0].instance().unwrap();
    assert_eq!(label.get("Label"), Some(Value::from("Hello")));

    assert!(page.notify().is_empty());
    assert_eq!(label.get("Label"), Some(Value::from("Bye")));
}

#[test]
fn test_notify_twice_is_idempotent() {
    let (registry, templates) = page_registry();
    let out = walk(&registry, &templates, r#"<page class="x"></page>"#);
    let page = &out.nodes[0];

    page.notify();
    let first = page.snapshot();
    page.notify();
    assert_eq!(first, page.snapshot());
    assert_eq!(first.children[0].attributes.len(), 1);
}

#[test]
fn test_linked_type_mismatch_becomes_diagnostic() {
    let mut registry = Registry::new();
    registry.component::<Page>("page", "page").unwrap();
    registry.register("label-box", Wrapper::wrap::<Label>().unwrap());
    let mut templates = TemplateStore::new();
    templates.register("page", r#"<label-box :size="Title"></label-box>"#);

    let out = walk(&registry, &templates, "<page></page>");
    assert_eq!(out.nodes.len(), 1);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
    assert_eq!(out.diagnostics[0].tag.as_deref(), Some("label-box"));

    let label = out.nodes[0].children()[0].instance().unwrap();
    assert_eq!(label.get("Size"), Some(Value::Int(3)));
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_event_binding_in_template() {
    let mut registry = Registry::new();
    registry.component::<Counter>("counter", "counter").unwrap();
    let mut templates = TemplateStore::new();
    templates.register("counter", r#"<div @click="HandleClick"></div>"#);

    let out = walk(&registry, &templates, "<counter></counter>");
    assert!(out.is_clean());

    let counter = &out.nodes[0];
    let div = &counter.children()[0];
    assert_eq!(div.handlers().len(), 1);
    assert!(div.handle("click", &Event::new("click")));
    assert_eq!(
        counter.instance().unwrap().get("Counter"),
        Some(Value::Int(17))
    );
}

#[test]
fn test_event_binding_on_component_usage() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        r#"<mydivtwo @click="HandleClick"></mydivtwo>"#,
    );
    assert!(out.is_clean());

    let node = &out.nodes[0];
    assert!(node.handle("click", &Event::new("click")));
    assert_eq!(node.instance().unwrap().get("Num"), Some(Value::Int(1999)));
}

#[test]
fn test_missing_handler_drops_only_that_element() {
    let out = walk(
        &basic_registry(),
        &TemplateStore::new(),
        r#"<mydiv><span @click="HandleNope"></span><a></a></mydiv>"#,
    );
    assert_eq!(codes(&out), vec![ERR_UNRESOLVED_HANDLER]);
    assert!(out.has_fatal());
    assert_eq!(out.diagnostics[0].tag.as_deref(), Some("span"));
    assert!(out.diagnostics[0].message.contains("HandleNope"));

    let body = out.nodes[0].body();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].tag(), "a");
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

fn card_setup() -> (Registry, TemplateStore) {
    let mut registry = Registry::new();
    registry.component::<Page>("page", "page").unwrap();
    registry.component::<EmptyDiv>("card", "card").unwrap();
    let mut templates = TemplateStore::new();
    templates.register("page", r#"<card><span :title="Title"></span></card>"#);
    templates.register("card", r#"<header :title="Title"></header>"#);
    (registry, templates)
}

#[test]
fn test_parent_name_resolves_in_body_not_in_template() {
    let (registry, templates) = card_setup();
    let out = walk(&registry, &templates, "<page></page>");

    assert_eq!(codes(&out), vec![ERR_UNRESOLVED_BINDING]);
    assert_eq!(out.diagnostics[0].tag.as_deref(), Some("header"));

    let card = &out.nodes[0].children()[0];
    let header = &card.children()[0];
    assert_eq!(header.property("title").unwrap().text(), "Title");

    let span = &card.body()[0];
    assert_eq!(span.property("title").unwrap().text(), "Hello");
}

#[test]
fn test_shared_template_scope_when_not_isolated() {
    let (registry, templates) = card_setup();
    let config = Config {
        isolate_templates: false,
        ..Config::default()
    };
    let out = walk_with(&registry, &templates, &config, "<page></page>");
    assert!(out.is_clean());

    let header = out.nodes[0].find(&[0, 0]).unwrap();
    assert_eq!(header.tag(), "header");
    assert_eq!(header.property("title").unwrap().text(), "Hello");
}

#[test]
fn test_non_identifier_binding_is_unresolved() {
    let (registry, templates) = page_registry();
    let mut templates = templates;
    templates.register("page", r#"<label-box :label="Title + 1"></label-box>"#);

    let out = walk(&registry, &templates, "<page></page>");
    assert_eq!(codes(&out), vec![ERR_UNRESOLVED_BINDING]);
    let attr = out.nodes[0].children()[0].property("label").unwrap();
    assert_eq!(attr.binding(), BindingKind::Dynamic);
    assert_eq!(attr.text(), "Title + 1");
}

// ═══════════════════════════════════════════════════════════════════════════════
// FATAL CONDITIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_template_is_fatal_for_that_component() {
    let mut registry = basic_registry();
    registry.register_template("mydiv", "absent");

    let out = walk(&registry, &TemplateStore::new(), "<mydiv></mydiv><section></section>");
    assert_eq!(codes(&out), vec![ERR_MISSING_TEMPLATE]);
    assert!(out.diagnostics[0].message.contains("absent"));
    assert_eq!(out.nodes.len(), 1);
    assert_eq!(out.nodes[0].tag(), "section");
}

#[test]
fn test_failed_initialization_drops_component() {
    let mut registry = basic_registry();
    registry.register("broken", Wrapper::wrap::<Broken>().unwrap());

    let out = walk(&registry, &TemplateStore::new(), "<div><broken></broken><mydiv></mydiv></div>");
    assert_eq!(codes(&out), vec![ERR_INITIALIZATION_FAILED]);
    let children = out.nodes[0].children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag(), "mydiv");
}

#[test]
fn test_recursive_template_hits_depth_limit() {
    let mut registry = Registry::new();
    registry.component::<EmptyDiv>("nest", "nest").unwrap();
    let mut templates = TemplateStore::new();
    templates.register("nest", "<nest></nest>");
    let config = Config {
        max_depth: 4,
        ..Config::default()
    };

    let out = walk_with(&registry, &templates, &config, "<nest></nest>");
    assert_eq!(codes(&out), vec![ERR_RECURSION_LIMIT]);

    let depth = out.nodes[0].iter().count();
    assert_eq!(depth, 4);
}

#[test]
fn test_template_parse_errors_are_reported() {
    let mut registry = basic_registry();
    registry.register_template("mydiv", "unclosed");
    let mut templates = TemplateStore::new();
    templates.register("unclosed", "<section><div></section>");

    let out = walk(&registry, &templates, "<mydiv></mydiv>");
    assert!(!out.is_clean());
    assert!(codes(&out).iter().all(|c| *c == ERR_PARSE));
    assert!(!out.has_fatal());
    assert_eq!(out.nodes[0].children()[0].tag(), "section");
}

#[test]
fn test_walk_nodes_skips_initial_notify() {
    let (registry, templates) = page_registry();
    let config = Config::default();
    let parsed = parse_markup("<page></page>");

    let mut walker = Walker::new(&registry, &templates, &config);
    let nodes = walker.walk_nodes(&parsed.tree.nodes, &Scope::root());
    assert!(walker.diagnostics().is_empty());
    assert_eq!(walker.depth(), 0);

    let label = nodes[0].children()[0].instance().unwrap();
    assert_eq!(label.get("Label"), Some(Value::from("")));
    nodes[0].notify();
    assert_eq!(label.get("Label"), Some(Value::from("Hello")));
}

//! Components shared by the test suites.

use std::cell::Cell;

use crate::component::{Component, Descriptor, Event};

thread_local! {
    static INIT_CALLS: Cell<usize> = const { Cell::new(0) };
}

/// Number of `MyDiv::init` calls made on this thread so far.
pub fn init_calls() -> usize {
    INIT_CALLS.with(|c| c.get())
}

#[derive(Default)]
pub struct MyDiv {
    pub input: String,
    pub counter: i64,
}

impl Component for MyDiv {
    fn init(&mut self) -> Result<(), String> {
        INIT_CALLS.with(|c| c.set(c.get() + 1));
        self.counter = 11;
        self.input = "MyDiv".to_string();
        Ok(())
    }

    fn describe(d: &mut Descriptor<Self>) {
        d.prop("Input", |c| &c.input, |c| &mut c.input)
            .field("Counter", |c| &c.counter, |c| &mut c.counter);
    }
}

#[derive(Default)]
pub struct MyDivTwo {
    pub input: String,
    pub num: i64,
}

impl MyDivTwo {
    fn handle_click(&mut self, _event: &Event) {
        self.num = 1999;
    }
}

impl Component for MyDivTwo {
    fn init(&mut self) -> Result<(), String> {
        self.num = 99;
        self.input = "MyDivTwo".to_string();
        Ok(())
    }

    fn describe(d: &mut Descriptor<Self>) {
        d.prop("Input", |c| &c.input, |c| &mut c.input)
            .field("Num", |c| &c.num, |c| &mut c.num)
            .method("HandleClick", Self::handle_click);
    }
}

#[derive(Default)]
pub struct EmptyDiv {
    pub data: String,
}

impl Component for EmptyDiv {
    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn describe(d: &mut Descriptor<Self>) {
        d.prop("Data", |c| &c.data, |c| &mut c.data);
    }
}

#[derive(Default)]
pub struct Counter {
    pub counter: i64,
}

impl Counter {
    fn handle_click(&mut self, _event: &Event) {
        self.counter += 6;
    }

    fn reset(&mut self, _event: &Event) {
        self.counter = 0;
    }
}

impl Component for Counter {
    fn init(&mut self) -> Result<(), String> {
        self.counter = 11;
        Ok(())
    }

    fn describe(d: &mut Descriptor<Self>) {
        d.field("Counter", |c| &c.counter, |c| &mut c.counter)
            .method("HandleClick", Self::handle_click)
            .method("reset", Self::reset);
    }
}

/// Parent side of a prop-passing pair.
#[derive(Default)]
pub struct Page {
    pub title: String,
    pub clicks: i64,
}

impl Page {
    fn handle_rename(&mut self, event: &Event) {
        self.title = event
            .detail
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
    }

    fn handle_click(&mut self, _event: &Event) {
        self.clicks += 1;
    }
}

impl Component for Page {
    fn init(&mut self) -> Result<(), String> {
        self.title = "Hello".to_string();
        Ok(())
    }

    fn describe(d: &mut Descriptor<Self>) {
        d.field("Title", |c| &c.title, |c| &mut c.title)
            .field("Clicks", |c| &c.clicks, |c| &mut c.clicks)
            .method("HandleRename", Self::handle_rename)
            .method("HandleClick", Self::handle_click);
    }
}

/// Child side of a prop-passing pair.
#[derive(Default)]
pub struct Label {
    pub label: String,
    pub size: i64,
}

impl Component for Label {
    fn init(&mut self) -> Result<(), String> {
        self.size = 3;
        Ok(())
    }

    fn describe(d: &mut Descriptor<Self>) {
        d.prop("Label", |c| &c.label, |c| &mut c.label)
            .prop("Size", |c| &c.size, |c| &mut c.size);
    }
}

#[derive(Default)]
pub struct Broken;

impl Component for Broken {
    fn init(&mut self) -> Result<(), String> {
        Err("no backing store".to_string())
    }

    fn describe(_d: &mut Descriptor<Self>) {}
}

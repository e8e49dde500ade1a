//! Exercises `#[derive(Publish)]`-generated `Publisher` impls end to end
//! through a real `Serializer`, since `istree`'s own unit tests can't use the
//! derive on themselves.

use std::cell::RefCell;
use std::rc::Rc;

use istree::{
    DeclaratorId, Format, MemoryStream, Publish, Publisher, PropertyValue, Ref, RefSlot,
    ReferenceRegistry, SerNodeInfo, Serializer, Stream, WantObjectOutcome, WantReason,
};

#[derive(Publish)]
struct Point {
    #[publish(identity)]
    id: DeclaratorId,
    #[publish(declarator)]
    owner: RefCell<DeclaratorId>,
    x: i32,
    y: i32,
}

impl Point {
    fn new(x: i32, y: i32) -> Self {
        Self {
            id: DeclaratorId::new(),
            owner: RefCell::new(DeclaratorId::new()),
            x,
            y,
        }
    }
}

#[derive(Publish)]
struct Line {
    #[publish(identity)]
    id: DeclaratorId,
    #[publish(declarator)]
    owner: RefCell<DeclaratorId>,
    #[publish(object)]
    start: Point,
    #[publish(object)]
    end: Point,
}

impl Line {
    fn new(start: Point, end: Point) -> Self {
        let id = DeclaratorId::new();
        start.owner.replace(id.clone());
        end.owner.replace(id.clone());
        Self {
            owner: RefCell::new(id.clone()),
            id,
            start,
            end,
        }
    }
}

#[derive(Publish)]
struct Body {
    #[publish(identity)]
    id: DeclaratorId,
    #[publish(declarator)]
    owner: RefCell<DeclaratorId>,
    #[publish(reference)]
    anchor: Ref<Point>,
}

impl Body {
    fn new() -> Self {
        Self {
            id: DeclaratorId::new(),
            owner: RefCell::new(DeclaratorId::new()),
            anchor: Ref::null(),
        }
    }
}

#[derive(Publish)]
struct Reading {
    #[publish(identity)]
    id: DeclaratorId,
    #[publish(declarator)]
    owner: RefCell<DeclaratorId>,
    #[publish(readonly)]
    value: i32,
}

#[derive(Publish)]
#[publish(class = "Widget")]
struct Renamed {
    #[publish(identity)]
    id: DeclaratorId,
    #[publish(declarator)]
    owner: RefCell<DeclaratorId>,
    #[publish(rename = "displayName")]
    name: String,
}

fn no_callbacks() -> (
    impl FnMut(&SerNodeInfo, WantReason) -> Option<istree::Descriptor>,
    impl FnMut(&SerNodeInfo, &mut dyn istree::RefSlot) -> WantObjectOutcome,
) {
    (|_: &SerNodeInfo, _: WantReason| None, |_: &SerNodeInfo, _: &mut dyn istree::RefSlot| {
        WantObjectOutcome::Skip
    })
}

#[test]
fn derived_publisher_round_trips_flat_fields_through_every_format() {
    for format in [Format::Binary, Format::Text, Format::Json] {
        let source = Point::new(3, 4);

        let mut mem = MemoryStream::new();
        let mut ser = Serializer::new();
        ser.publisher_to_stream(&source, &mut mem, format).unwrap();

        mem.set_position(0).unwrap();
        let mut target = Point::new(0, 0);
        let registry = ReferenceRegistry::new();
        let (mut no_descriptor, mut no_object) = no_callbacks();
        ser.stream_to_publisher(
            &mut mem,
            &mut target,
            format,
            &registry,
            &mut no_descriptor,
            &mut no_object,
        )
        .unwrap();

        assert_eq!(target.x, 3);
        assert_eq!(target.y, 4);
    }
}

#[test]
fn derived_publisher_recurses_into_owned_sub_objects() {
    let source = Line::new(Point::new(0, 0), Point::new(10, 20));

    let mut mem = MemoryStream::new();
    let mut ser = Serializer::new();
    ser.publisher_to_stream(&source, &mut mem, Format::Binary).unwrap();

    mem.set_position(0).unwrap();
    let mut target = Line::new(Point::new(-1, -1), Point::new(-1, -1));
    let registry = ReferenceRegistry::new();
    let (mut no_descriptor, mut no_object) = no_callbacks();
    ser.stream_to_publisher(
        &mut mem,
        &mut target,
        Format::Binary,
        &registry,
        &mut no_descriptor,
        &mut no_object,
    )
    .unwrap();

    assert_eq!(target.end.x, 10);
    assert_eq!(target.end.y, 20);
    assert!((&target.start as &dyn Publisher).is_owned_by(&target));
    assert!((&target.end as &dyn Publisher).is_owned_by(&target));
}

#[test]
fn derived_publisher_resolves_reference_field_from_registry() {
    let anchor = Rc::new(RefCell::new(Point::new(1, 2)));
    let type_name = std::any::type_name::<Point>();

    let mut registry = ReferenceRegistry::new();
    registry.store(type_name, anchor.clone(), "anchor_1").unwrap();

    let mut source = Body::new();
    source.anchor.bind(anchor.clone(), "anchor_1");

    let mut mem = MemoryStream::new();
    let mut ser = Serializer::new();
    ser.publisher_to_stream(&source, &mut mem, Format::Text).unwrap();

    mem.set_position(0).unwrap();
    let mut target = Body::new();
    let (mut no_descriptor, mut no_object) = no_callbacks();
    ser.stream_to_publisher(
        &mut mem,
        &mut target,
        Format::Text,
        &registry,
        &mut no_descriptor,
        &mut no_object,
    )
    .unwrap();

    assert!(target.anchor.is_bound());
    assert!(Rc::ptr_eq(&target.anchor.get().unwrap(), &anchor));
}

#[test]
fn readonly_field_rejects_writes_but_still_reads() {
    let mut reading = Reading {
        id: DeclaratorId::new(),
        owner: RefCell::new(DeclaratorId::new()),
        value: 5,
    };

    assert_eq!(reading.read_value(0), Some(5i32.into_value()));
    assert!(reading.write_value("value", 9i32.into_value()).is_err());
    assert_eq!(reading.value, 5);
}

#[test]
fn rename_and_class_attributes_are_honored() {
    let renamed = Renamed {
        id: DeclaratorId::new(),
        owner: RefCell::new(DeclaratorId::new()),
        name: "hi".to_owned(),
    };

    assert_eq!(renamed.class_name(), "Widget");
    assert!(renamed.publication_by_name("displayName").is_some());
    assert!(renamed.publication_by_name("name").is_none());
}

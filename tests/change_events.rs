use std::path::PathBuf;

use globwatch::watch::EventForwarder;
use globwatch::{ChangeEvent, ChangeOp, WatchError};
use notify::event::{
    AccessKind, AccessMode, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind,
    RenameMode,
};
use notify::{Event, EventKind};

#[test]
fn notify_kinds_map_to_change_ops() {
    let cases = [
        (EventKind::Create(CreateKind::File), ChangeOp::Create),
        (
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            ChangeOp::Write,
        ),
        (EventKind::Modify(ModifyKind::Any), ChangeOp::Write),
        (
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            ChangeOp::Rename,
        ),
        (
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            ChangeOp::Chmod,
        ),
        (EventKind::Remove(RemoveKind::File), ChangeOp::Remove),
        (EventKind::Any, ChangeOp::Other),
        (EventKind::Other, ChangeOp::Other),
    ];

    for (kind, expected) in cases {
        assert_eq!(ChangeOp::from_kind(&kind), Some(expected), "{kind:?}");
    }
}

#[test]
fn access_events_are_not_changes() {
    for kind in [
        EventKind::Access(AccessKind::Open(AccessMode::Any)),
        EventKind::Access(AccessKind::Read),
        EventKind::Access(AccessKind::Close(AccessMode::Read)),
        EventKind::Access(AccessKind::Close(AccessMode::Write)),
        EventKind::Access(AccessKind::Any),
    ] {
        assert_eq!(ChangeOp::from_kind(&kind), None, "{kind:?}");
    }
}

#[test]
fn forwarder_sends_one_event_per_path() {
    let (forwarder, mut streams) = EventForwarder::channel();

    let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(PathBuf::from("old.go"))
        .add_path(PathBuf::from("new.go"));
    forwarder.forward(Ok(event));

    assert_eq!(
        streams.events.try_recv().ok(),
        Some(ChangeEvent::new("old.go", ChangeOp::Rename))
    );
    assert_eq!(
        streams.events.try_recv().ok(),
        Some(ChangeEvent::new("new.go", ChangeOp::Rename))
    );
    assert!(streams.events.try_recv().is_err());
}

#[test]
fn forwarder_drops_access_events() {
    let (forwarder, mut streams) = EventForwarder::channel();

    let open = Event::new(EventKind::Access(AccessKind::Open(AccessMode::Any)))
        .add_path(PathBuf::from("main.go"));
    forwarder.forward(Ok(open));

    assert!(streams.events.try_recv().is_err());
    assert!(streams.errors.try_recv().is_err());
}

#[test]
fn forwarder_routes_backend_errors_to_the_error_stream() {
    let (forwarder, mut streams) = EventForwarder::channel();

    forwarder.forward(Err(notify::Error::generic("inotify queue overflow")));

    match streams.errors.try_recv() {
        Ok(WatchError::Notify(err)) => assert!(err.to_string().contains("overflow")),
        other => panic!("expected Notify error, got {other:?}"),
    }
    assert!(streams.events.try_recv().is_err());
}

#[test]
fn forwarder_outliving_its_streams_is_harmless() {
    let (forwarder, streams) = EventForwarder::channel();
    drop(streams);

    forwarder.forward(Ok(
        Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("a.txt"))
    ));
    forwarder.forward(Err(notify::Error::generic("late")));
}

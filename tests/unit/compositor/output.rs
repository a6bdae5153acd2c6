use super::*;
use crate::host::catalog::RouteChoice;
use crate::host::memory::{HostEvent, MemoryHost, Playback};
use crate::host::scene::SceneGraph;

const CH: Channel = Channel(7);

fn setup() -> (Arc<MemoryHost>, OutputCompositor) {
    let host = Arc::new(MemoryHost::new());
    host.add_transition_template("Fade");
    host.add_transition_template("Slide");
    host.add_transition_template("Stinger");
    let comp = OutputCompositor::new(host.clone(), host.clone(), CH).with_routing(host.clone());
    (host, comp)
}

fn source(host: &Arc<MemoryHost>, name: &str) -> OwnedSource {
    let acquired = host
        .create_source("image_source", name, &serde_json::Value::Null)
        .unwrap();
    OwnedSource::adopt(host.clone(), acquired)
}

fn set_output_events(events: &[HostEvent]) -> Vec<Option<SourceId>> {
    events
        .iter()
        .filter_map(|e| match e {
            HostEvent::SetOutput { source, .. } => Some(*source),
            _ => None,
        })
        .collect()
}

#[test]
fn repeated_apply_is_a_noop() {
    let (host, mut comp) = setup();
    let a = source(&host, "a");
    host.take_events();

    assert_eq!(comp.apply_source(Some(&a)), ApplyOutcome::Cut);
    assert_eq!(comp.apply_source(Some(&a)), ApplyOutcome::Unchanged);
    assert_eq!(set_output_events(&host.take_events()), vec![Some(a.id())]);
}

#[test]
fn cuts_directly_without_transitions() {
    let (host, mut comp) = setup();
    let a = source(&host, "a");
    let b = source(&host, "b");

    assert_eq!(comp.apply_source(Some(&a)), ApplyOutcome::Cut);
    assert_eq!(comp.apply_source(Some(&b)), ApplyOutcome::Cut);
    assert_eq!(host.occupant(CH), Some(b.id()));
    assert_eq!(
        set_output_events(&host.events()),
        vec![Some(a.id()), Some(b.id())]
    );
}

#[test]
fn show_animates_from_empty() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Show, "Fade", DurationMs(500));
    let show = comp.transition(TransitionRole::Show).unwrap();
    let a = source(&host, "a");

    assert_eq!(
        comp.apply_source(Some(&a)),
        ApplyOutcome::Animated {
            role: TransitionRole::Show,
            transition: show,
            duration: DurationMs(500),
        }
    );
    assert_eq!(host.occupant(CH), Some(show));
    assert_eq!(
        host.playback(show),
        Some(Playback::Playing {
            from: None,
            to: Some(a.id()),
            mode: TransitionMode::Auto,
            duration: DurationMs(500),
            elapsed_ms: 0,
        })
    );
}

#[test]
fn hide_animates_to_empty() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Hide, "Slide", DurationMs(250));
    let hide = comp.transition(TransitionRole::Hide).unwrap();
    let a = source(&host, "a");

    assert_eq!(comp.apply_source(Some(&a)), ApplyOutcome::Cut);
    let outcome = comp.apply_source(None);
    assert_eq!(
        outcome,
        ApplyOutcome::Animated {
            role: TransitionRole::Hide,
            transition: hide,
            duration: DurationMs(250),
        }
    );
    assert_eq!(host.occupant(CH), Some(hide));

    host.advance(250);
    assert_eq!(host.visible_source(CH), None);
    assert_eq!(comp.apply_source(None), ApplyOutcome::Unchanged);
}

#[test]
fn routing_table_overrides_default() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Default, "Fade", DurationMs(300));
    host.add_route(
        "a",
        "b",
        RouteChoice {
            transition: "Slide".to_string(),
            duration: DurationMs(800),
        },
    );
    let a = source(&host, "a");
    let b = source(&host, "b");

    let first = comp.apply_source(Some(&a));
    assert!(matches!(
        first,
        ApplyOutcome::Animated {
            role: TransitionRole::Default,
            ..
        }
    ));

    let second = comp.apply_source(Some(&b));
    let ApplyOutcome::Animated {
        role,
        transition,
        duration,
    } = second
    else {
        panic!("expected animation, got {second:?}");
    };
    assert_eq!(role, TransitionRole::Override);
    assert_eq!(duration, DurationMs(800));
    assert_eq!(comp.transition(TransitionRole::Override), Some(transition));
    assert_eq!(comp.transition_name(TransitionRole::Override), Some("Slide"));
    assert_eq!(host.occupant(CH), Some(transition));
}

#[test]
fn routing_miss_clears_stale_override() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Default, "Fade", DurationMs(300));
    host.add_route(
        "a",
        "b",
        RouteChoice {
            transition: "Slide".to_string(),
            duration: DurationMs(800),
        },
    );
    let a = source(&host, "a");
    let b = source(&host, "b");
    let c = source(&host, "c");

    comp.apply_source(Some(&a));
    comp.apply_source(Some(&b));
    assert!(comp.transition(TransitionRole::Override).is_some());

    let outcome = comp.apply_source(Some(&c));
    assert_eq!(comp.transition(TransitionRole::Override), None);
    assert!(matches!(
        outcome,
        ApplyOutcome::Animated {
            role: TransitionRole::Default,
            duration: DurationMs(300),
            ..
        }
    ));
    assert_eq!(host.over_releases(), 0);
}

#[test]
fn swapping_live_override_never_empties_slot() {
    let (host, mut comp) = setup();
    host.add_route(
        "a",
        "b",
        RouteChoice {
            transition: "Slide".to_string(),
            duration: DurationMs(800),
        },
    );
    let a = source(&host, "a");
    let b = source(&host, "b");
    comp.apply_source(Some(&a));
    comp.apply_source(Some(&b));
    let old = comp.transition(TransitionRole::Override).unwrap();
    assert_eq!(host.occupant(CH), Some(old));
    host.take_events();

    comp.set_transition("Stinger", TransitionRole::Override);
    let new = comp.transition(TransitionRole::Override).unwrap();
    let events = host.take_events();

    assert_eq!(set_output_events(&events), vec![Some(new)]);
    let begin = events
        .iter()
        .position(|e| *e == HostEvent::SwapBegin { new, old })
        .unwrap();
    let set = events
        .iter()
        .position(|e| matches!(e, HostEvent::SetOutput { .. }))
        .unwrap();
    let end = events
        .iter()
        .position(|e| *e == HostEvent::SwapEnd { new, old })
        .unwrap();
    assert!(begin < set && set < end);
    assert_eq!(host.occupant(CH), Some(new));
    assert!(!host.is_alive(old));
    assert!(!host.swap_in_progress());
    assert_eq!(host.visible_source(CH), Some(b.id()));
}

#[test]
fn duration_round_trips_into_animation() {
    let (host, mut comp) = setup();
    comp.set_transition("Fade", TransitionRole::Show);
    comp.set_transition_duration(DurationMs(1234), TransitionRole::Show);
    assert_eq!(comp.transition_duration(TransitionRole::Show), DurationMs(1234));
    let a = source(&host, "a");

    let ApplyOutcome::Animated { duration, .. } = comp.apply_source(Some(&a)) else {
        panic!("expected animation");
    };
    assert_eq!(duration, DurationMs(1234));
}

#[test]
fn teardown_clears_slot_and_releases_once() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Show, "Fade", DurationMs(500));
    comp.configure(TransitionRole::Hide, "Slide", DurationMs(500));
    let show = comp.transition(TransitionRole::Show).unwrap();
    let hide = comp.transition(TransitionRole::Hide).unwrap();
    let a = source(&host, "a");
    comp.apply_source(Some(&a));
    assert_eq!(host.occupant(CH), Some(show));

    drop(comp);
    assert_eq!(host.occupant(CH), None);
    assert!(!host.is_alive(show));
    assert!(!host.is_alive(hide));
    assert_eq!(host.over_releases(), 0);

    let destroyed = host
        .events()
        .iter()
        .filter(|e| matches!(e, HostEvent::Destroyed { id } if *id == show || *id == hide))
        .count();
    assert_eq!(destroyed, 2);

    drop(a);
    assert_eq!(host.live_sources(), 3);
}

#[test]
fn teardown_leaves_foreign_occupant_alone() {
    let (host, comp) = setup();
    let other = source(&host, "program");
    host.set_output(CH, Some(other.id()));

    drop(comp);
    assert_eq!(host.occupant(CH), Some(other.id()));
}

#[test]
fn unknown_name_clears_role() {
    let (host, mut comp) = setup();
    comp.set_transition("Fade", TransitionRole::Default);
    let fade = comp.transition(TransitionRole::Default).unwrap();

    comp.set_transition("Nope", TransitionRole::Default);
    assert_eq!(comp.transition(TransitionRole::Default), None);
    assert_eq!(comp.transition_name(TransitionRole::Default), None);
    assert!(!host.is_alive(fade));
}

#[test]
fn clearing_an_empty_role_touches_nothing() {
    let (host, mut comp) = setup();
    host.take_events();
    comp.set_transition("", TransitionRole::Hide);
    assert!(host.events().is_empty());
}

#[test]
fn same_template_keeps_instance() {
    let (host, mut comp) = setup();
    comp.set_transition("Fade", TransitionRole::Show);
    let first = comp.transition(TransitionRole::Show).unwrap();
    host.take_events();

    comp.set_transition("Fade", TransitionRole::Show);
    assert_eq!(comp.transition(TransitionRole::Show), Some(first));
    assert!(host.events().is_empty());
}

#[test]
fn replacing_idle_instance_leaves_slot_untouched() {
    let (host, mut comp) = setup();
    comp.set_transition("Fade", TransitionRole::Hide);
    let a = source(&host, "a");
    comp.apply_source(Some(&a));
    host.take_events();

    comp.set_transition("Slide", TransitionRole::Hide);
    let events = host.take_events();
    assert!(set_output_events(&events).is_empty());
    assert!(!events.iter().any(|e| matches!(e, HostEvent::SwapBegin { .. })));
    assert_eq!(host.occupant(CH), Some(a.id()));
}

#[test]
fn removing_live_transition_empties_slot() {
    let (host, mut comp) = setup();
    comp.set_transition("Fade", TransitionRole::Show);
    let a = source(&host, "a");
    comp.apply_source(Some(&a));

    comp.set_transition("", TransitionRole::Show);
    assert_eq!(host.occupant(CH), None);
    assert_eq!(host.over_releases(), 0);
}

#[test]
fn default_role_does_not_alias_other_roles() {
    let (_host, mut comp) = setup();
    comp.set_transition("Fade", TransitionRole::Show);
    let show = comp.transition(TransitionRole::Show);

    comp.set_transition("Slide", TransitionRole::Default);
    assert_eq!(comp.transition(TransitionRole::Show), show);
    assert_eq!(comp.transition_name(TransitionRole::Default), Some("Slide"));
    assert_eq!(comp.transition_name(TransitionRole::Show), Some("Fade"));
}

#[test]
fn retarget_mid_flight_reuses_playing_transition() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Default, "Fade", DurationMs(400));
    let a = source(&host, "a");
    let b = source(&host, "b");
    comp.apply_source(Some(&a));
    let fade = comp.transition(TransitionRole::Default).unwrap();
    host.take_events();

    comp.apply_source(Some(&b));
    let events = host.take_events();
    assert!(set_output_events(&events).is_empty());
    assert!(events.contains(&HostEvent::TransitionStarted {
        transition: fade,
        duration: DurationMs(400),
        end: Some(b.id()),
    }));
}

#[test]
fn applying_mid_flight_target_again_is_a_noop() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Show, "Fade", DurationMs(500));
    let a = source(&host, "a");
    comp.apply_source(Some(&a));
    host.advance(100);
    host.take_events();

    assert_eq!(comp.apply_source(Some(&a)), ApplyOutcome::Unchanged);
    let events = host.take_events();
    assert!(set_output_events(&events).is_empty());
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, HostEvent::TransitionStarted { .. }))
    );
    assert_eq!(host.over_releases(), 0);
}

#[test]
fn every_reference_is_returned() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Show, "Fade", DurationMs(100));
    comp.configure(TransitionRole::Hide, "Slide", DurationMs(100));
    comp.configure(TransitionRole::Default, "Stinger", DurationMs(100));
    let a = source(&host, "a");
    let b = source(&host, "b");

    comp.apply_source(Some(&a));
    host.advance(50);
    comp.apply_source(Some(&b));
    host.advance(100);
    comp.apply_source(None);
    comp.set_transition("Fade", TransitionRole::Hide);
    host.advance(100);

    drop(comp);
    drop(a);
    drop(b);
    assert_eq!(host.over_releases(), 0);
    assert_eq!(host.live_sources(), 3);
}

#[test]
fn route_to_unknown_transition_falls_back_to_default() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Default, "Fade", DurationMs(300));
    let fade = comp.transition(TransitionRole::Default).unwrap();
    host.add_route(
        "a",
        "b",
        RouteChoice {
            transition: "Missing".to_string(),
            duration: DurationMs(800),
        },
    );
    host.add_route(
        "b",
        "c",
        RouteChoice {
            transition: String::new(),
            duration: DurationMs(900),
        },
    );
    let a = source(&host, "a");
    let b = source(&host, "b");
    let c = source(&host, "c");
    let expected = ApplyOutcome::Animated {
        role: TransitionRole::Default,
        transition: fade,
        duration: DurationMs(300),
    };

    comp.apply_source(Some(&a));
    assert_eq!(comp.apply_source(Some(&b)), expected);
    assert_eq!(comp.transition(TransitionRole::Override), None);
    assert_eq!(comp.apply_source(Some(&c)), expected);
    assert_eq!(comp.transition(TransitionRole::Override), None);

    drop(comp);
    drop((a, b, c));
    assert_eq!(host.over_releases(), 0);
    assert_eq!(host.live_sources(), 3);
}

#[test]
fn no_routing_table_uses_default() {
    let host = Arc::new(MemoryHost::new());
    host.add_transition_template("Fade");
    host.add_transition_template("Slide");
    host.add_route(
        "a",
        "b",
        RouteChoice {
            transition: "Slide".to_string(),
            duration: DurationMs(800),
        },
    );
    let mut comp = OutputCompositor::new(host.clone(), host.clone(), CH);
    comp.configure(TransitionRole::Default, "Fade", DurationMs(450));
    let fade = comp.transition(TransitionRole::Default).unwrap();
    let a = source(&host, "a");
    let b = source(&host, "b");

    comp.apply_source(Some(&a));
    assert_eq!(
        comp.apply_source(Some(&b)),
        ApplyOutcome::Animated {
            role: TransitionRole::Default,
            transition: fade,
            duration: DurationMs(450),
        }
    );
    assert_eq!(comp.transition(TransitionRole::Override), None);

    drop(comp);
    drop((a, b));
    assert_eq!(host.over_releases(), 0);
    assert_eq!(host.live_sources(), 2);
}

#[test]
fn routing_miss_with_live_override_empties_slot_before_default() {
    let (host, mut comp) = setup();
    comp.configure(TransitionRole::Default, "Fade", DurationMs(300));
    let fade = comp.transition(TransitionRole::Default).unwrap();
    host.add_route(
        "a",
        "b",
        RouteChoice {
            transition: "Slide".to_string(),
            duration: DurationMs(800),
        },
    );
    let a = source(&host, "a");
    let b = source(&host, "b");
    let c = source(&host, "c");
    comp.apply_source(Some(&a));
    comp.apply_source(Some(&b));
    let over = comp.transition(TransitionRole::Override).unwrap();
    assert_eq!(host.occupant(CH), Some(over));
    host.take_events();

    comp.apply_source(Some(&c));
    let events = host.take_events();

    // The stale override is removed from the slot before the default is installed.
    assert_eq!(set_output_events(&events), vec![None, Some(fade)]);
    let cleared = events
        .iter()
        .position(|e| *e == HostEvent::TransitionCleared { transition: over })
        .unwrap();
    let started = events
        .iter()
        .position(|e| {
            matches!(e, HostEvent::TransitionStarted { transition, .. } if *transition == fade)
        })
        .unwrap();
    assert!(cleared < started);
    assert!(!host.is_alive(over));
    assert_eq!(host.visible_source(CH), Some(c.id()));
    assert_eq!(host.over_releases(), 0);
}

use super::*;

fn input(host: &MemoryHost, name: &str) -> SourceId {
    host.create_source("color_source", name, &serde_json::Value::Null)
        .unwrap()
        .id()
}

#[test]
fn set_output_moves_references() {
    let host = MemoryHost::new();
    let a = input(&host, "a");
    let b = input(&host, "b");
    let ch = Channel(7);

    host.set_output(ch, Some(a));
    assert_eq!(host.ref_count(a), Some(2));
    host.set_output(ch, Some(b));
    assert_eq!(host.ref_count(a), Some(1));
    assert_eq!(host.ref_count(b), Some(2));

    host.set_output(ch, None);
    assert_eq!(host.occupant(ch), None);
    host.release(b);
    assert!(!host.is_alive(b));
    assert_eq!(host.over_releases(), 0);
}

#[test]
fn release_past_zero_is_flagged() {
    let host = MemoryHost::new();
    let a = input(&host, "a");
    host.release(a);
    host.release(a);
    assert_eq!(host.over_releases(), 1);
}

#[test]
fn auto_transition_finishes_on_advance() {
    let host = MemoryHost::new();
    let template = host.add_transition_template("Fade");
    let fade = host.duplicate(template, "Fade").unwrap().id();
    let a = input(&host, "a");

    host.transition_set(fade, None);
    host.transition_start(fade, TransitionMode::Auto, DurationMs(500), Some(a));
    assert_eq!(host.ref_count(a), Some(2));

    host.advance(499);
    assert!(matches!(host.playback(fade), Some(Playback::Playing { .. })));
    host.advance(1);
    assert_eq!(host.playback(fade), Some(Playback::Idle { shown: Some(a) }));
    assert!(host.events().contains(&HostEvent::TransitionFinished { transition: fade }));
}

#[test]
fn manual_transition_does_not_advance() {
    let host = MemoryHost::new();
    let template = host.add_transition_template("Cut");
    let cut = host.duplicate(template, "Cut").unwrap().id();
    host.transition_start(cut, TransitionMode::Manual, DurationMs(10), None);
    host.advance(1_000);
    assert!(matches!(host.playback(cut), Some(Playback::Playing { .. })));
}

#[test]
fn destroying_a_transition_releases_what_it_holds() {
    let host = MemoryHost::new();
    let template = host.add_transition_template("Fade");
    let fade = host.duplicate(template, "Fade").unwrap().id();
    let a = input(&host, "a");
    host.transition_set(fade, Some(a));
    assert_eq!(host.ref_count(a), Some(2));

    host.release(fade);
    assert!(!host.is_alive(fade));
    assert_eq!(host.ref_count(a), Some(1));
}

#[test]
fn swap_copies_playback_and_tracks_bracket() {
    let host = MemoryHost::new();
    let t1 = host.add_transition_template("Fade");
    let t2 = host.add_transition_template("Slide");
    let a = input(&host, "a");
    host.transition_set(t1, None);
    host.transition_start(t1, TransitionMode::Auto, DurationMs(300), Some(a));

    host.transition_swap_begin(t2, t1);
    assert!(host.swap_in_progress());
    host.transition_swap_end(t2, t1);
    assert!(!host.swap_in_progress());
    assert_eq!(host.playback(t2), host.playback(t1));
}

#[test]
fn visible_source_looks_through_transitions() {
    let host = MemoryHost::new();
    let ch = Channel(1);
    let template = host.add_transition_template("Fade");
    let a = input(&host, "a");
    host.set_output(ch, Some(a));
    assert_eq!(host.visible_source(ch), Some(a));

    host.transition_set(template, Some(a));
    host.set_output(ch, Some(template));
    assert_eq!(host.visible_source(ch), Some(a));
}

#[test]
fn routes_fall_back_to_wildcards() {
    let host = MemoryHost::new();
    let fade = RouteChoice {
        transition: "Fade".to_string(),
        duration: DurationMs(250),
    };
    let slide = RouteChoice {
        transition: "Slide".to_string(),
        duration: DurationMs(900),
    };
    host.add_route("a", "b", slide.clone());
    host.add_route(ANY_SOURCE, ANY_SOURCE, fade.clone());

    assert_eq!(host.lookup(Some("a"), Some("b")), Some(slide));
    assert_eq!(host.lookup(Some("b"), None), Some(fade));
}

#[test]
fn catalog_lists_templates_only() {
    let host = MemoryHost::new();
    host.add_transition_template("Fade");
    input(&host, "a");
    let names: Vec<String> = host.list_transitions().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["Fade".to_string()]);
}

#[test]
fn empty_type_id_is_rejected() {
    let host = MemoryHost::new();
    let err = host
        .create_source(" ", "x", &serde_json::Value::Null)
        .unwrap_err();
    assert!(err.to_string().contains("host error:"));
}

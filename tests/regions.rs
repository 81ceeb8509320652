use ds9_regions::coords::{check_wcs_sky, check_wcs_system};
use ds9_regions::{
    parse_regions, parse_regions_with, CoordMapper, CoordSystem, Marker, MarkerStyle, MemoryFrame, OverflowPolicy,
    ParserConfig, RegionSink, SinkError, SinkEvent, SkyFormat, SkyFrame, Spread, SyntaxError, Vector,
};
use std::cell::RefCell;

fn parse(src: &str) -> (MemoryFrame, Vec<SyntaxError>) {
    let mut frame = MemoryFrame::new();
    let mut errors = Vec::new();
    parse_regions_with(src, &mut frame, &ParserConfig::default(), |e| errors.push(e.clone())).unwrap();
    (frame, errors)
}

fn count(frame: &MemoryFrame, pred: impl Fn(&SinkEvent) -> bool) -> usize {
    frame.events.iter().filter(|e| pred(e)).count()
}

/// Keeps every position handed to the mapper.
#[derive(Default)]
struct Recorder {
    positions: RefCell<Vec<(Vector, CoordSystem, SkyFrame)>>,
}

impl CoordMapper for Recorder {
    fn map_to_ref(&self, v: Vector, system: CoordSystem, sky: SkyFrame) -> Vector {
        self.positions.borrow_mut().push((v, system, sky));
        v
    }

    fn map_len_to_ref(&self, d: f64, _: CoordSystem, _: SkyFormat) -> f64 {
        d
    }

    fn map_angle_to_ref(&self, angle: f64, _: CoordSystem, _: SkyFrame) -> f64 {
        angle
    }
}

impl RegionSink for Recorder {
    fn create(&mut self, _: Marker, _: MarkerStyle) -> Result<(), SinkError> {
        Ok(())
    }

    fn delete_last(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[test]
fn test_global_style_is_inherited() {
    let (frame, errors) = parse("global color=red\ncircle(1,1,1)\n");
    assert!(errors.is_empty());
    assert_eq!(frame.markers()[0].1.color, "red");
}

#[test]
fn test_local_override_does_not_leak() {
    let (frame, _) = parse("global color=red\ncircle(1,1,1) # color=blue\ncircle(2,2,2)\n");
    let live = frame.markers();
    assert_eq!(live[0].1.color, "blue");
    assert_eq!(live[1].1.color, "red");
}

#[test]
fn test_legacy_annulus_replaces_provisional_ellipse() {
    let (frame, errors) = parse("ellipse(1,1,2,3,0)\n2,4\n");
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(count(&frame, |e| matches!(e, SinkEvent::DeleteLast)), 1);
    let creates: Vec<&Marker> = frame
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::Create { marker, .. } => Some(marker),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 2);
    assert!(matches!(creates[0], Marker::Ellipse { .. }));
    match creates[1] {
        Marker::EllipseAnnulus { radii: Spread::List(radii), .. } => {
            assert_eq!(radii, &vec![Vector::new(2.0, 3.0), Vector::new(2.0, 4.0)]);
        }
        other => panic!("expected an ellipse annulus, got {:?}", other),
    }
    // the delete comes right before the annulus
    let delete_at = frame.events.iter().position(|e| matches!(e, SinkEvent::DeleteLast)).unwrap();
    assert!(matches!(frame.events[delete_at + 1], SinkEvent::Create { marker: Marker::EllipseAnnulus { .. }, .. }));

    let (frame, _) = parse("ellipse(1,1,2,3,0)\n");
    assert_eq!(count(&frame, |e| matches!(e, SinkEvent::DeleteLast)), 0);
    assert_eq!(frame.markers().len(), 1);
    assert!(matches!(frame.markers()[0].0, Marker::Ellipse { .. }));
}

#[test]
fn test_legacy_box_annulus_commits_at_next_shape() {
    let (frame, _) = parse("box(10,10,2,2,0) # color=red\n4,4\n6,6\ncircle(1,1,1)\n");
    let live = frame.markers();
    assert_eq!(live.len(), 2);
    match live[0].0 {
        Marker::BoxAnnulus { sizes: Spread::List(sizes), .. } => assert_eq!(sizes.len(), 3),
        other => panic!("expected a box annulus, got {:?}", other),
    }
    assert_eq!(live[0].1.color, "red");
    assert!(matches!(live[1].0, Marker::Circle { .. }));
}

#[test]
fn test_continuation_must_follow_its_shape() {
    for src in [
        "ellipse(1,1,2,3,0)\n# just a note\n2,4\n",
        "ellipse(1,1,2,3,0)\nglobal color=red\n2,4\n",
        "ellipse(1,1,2,3,0)\ncircle(5,5\n2,4\n",
        "ellipse(1,1,2,3,0) 7\n2,4\n",
    ] {
        let (frame, errors) = parse(src);
        assert_eq!(errors.last().map(|e| e.span.begin.line), Some(3), "{:?}: {:?}", src, errors);
        assert_eq!(count(&frame, |e| matches!(e, SinkEvent::DeleteLast)), 0, "{:?}", src);
        assert!(matches!(frame.markers()[0].0, Marker::Ellipse { .. }), "{:?}", src);
    }
}

#[test]
fn test_pending_annulus_commits_before_unrelated_statement() {
    let (frame, errors) = parse("box(10,10,2,2,0)\n4,4\n# note\n6,6\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].span.begin.line, 4);
    let live = frame.markers();
    assert_eq!(live.len(), 1);
    match live[0].0 {
        Marker::BoxAnnulus { sizes: Spread::List(sizes), .. } => {
            assert_eq!(sizes, &vec![Vector::new(2.0, 2.0), Vector::new(4.0, 4.0)]);
        }
        other => panic!("expected a box annulus, got {:?}", other),
    }
}

#[test]
fn test_saoimage_ellipse_annulus() {
    let (frame, errors) = parse("ellipse(5,5,4,2,0) & !ellipse(5,5,2,1,0)\n");
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(count(&frame, |e| matches!(e, SinkEvent::DeleteLast)), 0);
    let live = frame.markers();
    assert_eq!(live.len(), 1);
    match live[0].0 {
        Marker::EllipseAnnulus { radii: Spread::List(radii), center, .. } => {
            assert_eq!(*center, Vector::new(5.0, 5.0));
            assert_eq!(radii, &vec![Vector::new(2.0, 1.0), Vector::new(4.0, 2.0)]);
        }
        other => panic!("expected an ellipse annulus, got {:?}", other),
    }
}

#[test]
fn test_hour_scaling_depends_on_sky_frame() {
    let mut frame = Recorder::default();
    parse_regions("fk5; point(12:30:00, +45:00:00)\ngalactic; point(12:30:00, +45:00:00)\n", &mut frame).unwrap();
    let positions = frame.positions.borrow();
    assert_eq!(positions.len(), 2);
    assert!((positions[0].0.x - 187.5).abs() < 1e-9);
    assert!((positions[0].0.y - 45.0).abs() < 1e-9);
    assert_eq!(positions[0].2, SkyFrame::Fk5);
    assert!((positions[1].0.x - 12.5).abs() < 1e-9);
    assert_eq!(positions[1].2, SkyFrame::Galactic);
}

#[test]
fn test_pixel_systems_normalize_to_wcs() {
    for system in [CoordSystem::Image, CoordSystem::Physical] {
        for sky in [SkyFrame::Fk4, SkyFrame::Galactic, SkyFrame::Ecliptic] {
            assert_eq!(check_wcs_sky(system, sky), SkyFrame::NativeWcs);
        }
        assert_eq!(check_wcs_system(system), CoordSystem::Wcs);
    }
    assert_eq!(check_wcs_system(CoordSystem::WcsB), CoordSystem::WcsB);
}

#[test]
fn test_scratch_lists_clamp_in_order() {
    let radii: Vec<String> = (1..=600).map(|r| r.to_string()).collect();
    let angles: Vec<String> = (0..800).map(|a| a.to_string()).collect();
    let src = format!(
        "annulus(0,0,{})\ncpanda(0,0,0,360,4,1,2,1) # panda=({})(1 2)\ncircle(1,1,1)\n",
        radii.join(","),
        angles.join(" ")
    );
    let (frame, errors) = parse(&src);
    assert!(errors.is_empty(), "{:?}", errors);
    let live = frame.markers();
    assert_eq!(live.len(), 3);
    match live[0].0 {
        Marker::Annulus { radii: Spread::List(radii), .. } => {
            assert_eq!(radii.len(), 512);
            assert!(radii.iter().enumerate().all(|(i, r)| *r == (i + 1) as f64));
        }
        other => panic!("expected an annulus, got {:?}", other),
    }
    match live[1].0 {
        Marker::Cpanda { angles: Spread::List(angles), .. } => {
            assert_eq!(angles.len(), 720);
            assert!((angles[719] - 719f64.to_radians()).abs() < 1e-9);
        }
        other => panic!("expected a cpanda, got {:?}", other),
    }

    let mut frame = MemoryFrame::new();
    let config = ParserConfig { overflow: OverflowPolicy::Error, ..ParserConfig::default() };
    let mut errors = Vec::new();
    parse_regions_with(&src, &mut frame, &config, |e| errors.push(e.message.clone())).unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(frame.markers().len(), 1);
}

#[test]
fn test_one_bad_statement_one_error() {
    let (frame, errors) = parse("circle(1,1,1)\ncircle(2,2\ncircle(3,3,3)\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].span.begin.line, 2);
    assert_eq!(frame.markers().len(), 2);

    let mut frame = MemoryFrame::new();
    let config = ParserConfig { recover: false, ..ParserConfig::default() };
    let mut calls = 0;
    let result = parse_regions_with("circle(2,2\ncircle(3,3,3)\n", &mut frame, &config, |_| calls += 1);
    assert!(result.is_err());
    assert_eq!(calls, 1);
}

#[test]
fn test_tags_are_scoped_to_one_shape() {
    let (frame, _) = parse("circle(1,1,1) # tag={a} tag={b}\ncircle(2,2,2)\n");
    let live = frame.markers();
    assert_eq!(live[0].1.tags, vec!["a".to_string(), "b".to_string()]);
    assert!(live[1].1.tags.is_empty());
}

#[test]
fn test_ds9_version_4_file() {
    let src = "\
# Region file format: DS9 version 4.1
global color=green dashlist=8 3 width=1 font=\"helvetica 10 normal roman\" select=1 highlite=1 dash=0 fixed=0 edit=1 move=1 delete=1 include=1 source=1
fk5
circle(202.4699,47.1952,3.9\") # color=red text={M51}
box(202.4,47.2,20\",10\",45) # width=2
-polygon(202.47,47.19,202.48,47.20,202.46,47.21)
# vector(202.47,47.19,30\",90) vector=1
point(202.5,47.2) # point=cross
";
    let (frame, errors) = parse(src);
    assert!(errors.is_empty(), "{:?}", errors);
    let live = frame.markers();
    let shapes: Vec<&str> = live.iter().map(|(m, _)| m.shape_name()).collect();
    assert_eq!(shapes, vec!["circle", "box", "polygon", "vector", "point"]);
    assert_eq!(live[0].1.text, "M51");
    assert_eq!(live[1].1.width, 2);
    assert!(!live[2].1.props.contains(ds9_regions::Properties::INCLUDE));
}

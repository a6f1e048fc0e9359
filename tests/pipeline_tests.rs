// tests/pipeline_tests.rs
mod common;

use common::{marker_center, marker_config, scene};
use marker_core::{Observation, ResultTable};
use marker_cv::MemorySource;
use marker_tracker::{Result, SequenceDriver};
use rand::{rngs::StdRng, SeedableRng};

const WIDTH: i32 = 640;
const HEIGHT: i32 = 240;
const SPEED: i32 = 30;

fn marker_at(frame: usize) -> (i32, i32) {
    (40 + SPEED * frame as i32, 100)
}

#[test]
fn test_tracks_moving_marker() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let reference = scene(WIDTH, HEIGHT, &[], Some(&mut rng))?;
    let frames = (0..13)
        .map(|i| scene(WIDTH, HEIGHT, &[marker_at(i)], Some(&mut rng)))
        .collect::<Result<Vec<_>>>()?;

    let driver = SequenceDriver::new(marker_config(), 12);
    let result = driver.run_sequence(0, "synthetic", &reference, &mut MemorySource::new(frames)?)?;

    assert_eq!(result.frames.len(), 12);
    assert!(!result.aborted);
    for record in &result.frames {
        let (x, y) = marker_at(record.frame_index + 1);
        let (cx, cy) = marker_center(x, y);
        let position = match record.observation {
            Observation::Found(position) => position,
            Observation::NotFound => panic!("frame {} not detected", record.frame_index),
        };
        let frame = record.frame_index;
        assert!((position.x - cx).abs() < 2.0, "frame {}: x {} vs {}", frame, position.x, cx);
        assert!((position.y - cy).abs() < 2.0, "frame {}: y {} vs {}", frame, position.y, cy);
    }

    let mut table = ResultTable::new(driver.frame_count());
    table.push(result);
    let mut out = Vec::new();
    table.write_to(&mut out)?;
    let text = String::from_utf8(out)?;
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 12);
    for (i, row) in rows.iter().enumerate() {
        assert!(row.ends_with("\t1"), "row {}: {}", i, row);
    }
    Ok(())
}

#[test]
fn test_recovers_after_occlusion() -> Result<()> {
    let reference = scene(WIDTH, HEIGHT, &[], None)?;
    let hidden = 7;
    let frames = (0..12)
        .map(|i| {
            let markers = if i == hidden { vec![] } else { vec![marker_at(i)] };
            scene(WIDTH, HEIGHT, &markers, None)
        })
        .collect::<Result<Vec<_>>>()?;

    let driver = SequenceDriver::new(marker_config(), 11);
    let result = driver.run_sequence(0, "occluded", &reference, &mut MemorySource::new(frames)?)?;

    let flags: Vec<bool> = result.frames.iter().map(|record| record.detected()).collect();
    let mut expected = vec![true; 11];
    expected[hidden - 1] = false;
    assert_eq!(flags, expected);
    assert_eq!(result.detected_count(), 10);
    Ok(())
}

#[test]
fn test_ignores_static_structure() -> Result<()> {
    // One bright patch is part of the reference mask, another never moves
    let known = (300, 30);
    let still = (500, 180);
    let reference = scene(WIDTH, HEIGHT, &[known], None)?;
    let frames = (0..9)
        .map(|i| scene(WIDTH, HEIGHT, &[known, still, marker_at(i)], None))
        .collect::<Result<Vec<_>>>()?;

    let driver = SequenceDriver::new(marker_config(), 8);
    let mut source = MemorySource::new(frames)?;
    let result = driver.run_sequence(0, "distractors", &reference, &mut source)?;

    assert_eq!(result.detected_count(), 8);
    let last = result.frames[7].position();
    let (cx, _) = marker_center(marker_at(8).0, marker_at(8).1);
    assert!((last.x - cx).abs() < 2.0);
    Ok(())
}

#[test]
fn test_result_table_text() -> Result<()> {
    let reference = scene(WIDTH, HEIGHT, &[], None)?;
    let frames = (0..6)
        .map(|i| scene(WIDTH, HEIGHT, &[marker_at(i)], None))
        .collect::<Result<Vec<_>>>()?;

    let driver = SequenceDriver::new(marker_config(), 8);
    let result = driver.run_sequence(0, "short", &reference, &mut MemorySource::new(frames)?)?;
    assert_eq!(result.frames.len(), 5);

    let mut table = ResultTable::new(driver.frame_count());
    table.push(result);
    let mut out = Vec::new();
    table.write_to(&mut out)?;
    let text = String::from_utf8(out)?;

    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 8);
    for row in &rows[..5] {
        assert!(row.ends_with("\t1"), "{}", row);
        assert_eq!(row.split('\t').count(), 3);
    }
    // the source ran dry after five tracked frames
    assert_eq!(rows[5], "-1.000\t-1.000\t0");
    assert_eq!(rows[7], "-1.000\t-1.000\t0");
    Ok(())
}

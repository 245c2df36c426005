//! Example: print where each cylinder in a segment file ends up
//!
//! Usage: cargo run --example place_segments -- path/to/file.seg

use nalgebra::Vector3;
use std::env;
use std::process::ExitCode;
use rig3d_core::{load_segment_file, parse_segment_file, scenes, SegmentSpec};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let specs = if args.len() < 2 {
        eprintln!("Usage: {} <segment-file>", args[0]);
        eprintln!("\nNo segment file provided, using the cylinder showcase...");
        let text: String = scenes::showcase_segments()
            .into_iter()
            .map(|(color, top, bottom)| {
                format!(
                    "segment 0x{:06X} 50 0 ({}, {}, {}) ({}, {}, {})\n",
                    color.0, top.x, top.y, top.z, bottom.x, bottom.y, bottom.z
                )
            })
            .collect();
        parse_segment_file(&text)
    } else {
        load_segment_file(&args[1])
    };

    let specs = match specs {
        Ok(specs) => specs,
        Err(e) => {
            eprintln!("Failed to load segments: {e}");
            return ExitCode::FAILURE;
        }
    };

    for (i, spec) in specs.iter().enumerate() {
        report(i, spec);
    }
    ExitCode::SUCCESS
}

fn report(index: usize, spec: &SegmentSpec) {
    match rig3d_core::align(spec.top, spec.bottom) {
        Ok(placement) => {
            let center = placement.center();
            let (axis, angle) = placement
                .rotation
                .axis_angle()
                .map(|(axis, angle)| (axis.into_inner(), angle))
                .unwrap_or((Vector3::y(), 0.0));
            println!(
                "#{index}: length {:.2}, center ({:.2}, {:.2}, {:.2}), rotate {:.1} deg about ({:.3}, {:.3}, {:.3})",
                placement.length,
                center.x,
                center.y,
                center.z,
                angle.to_degrees(),
                axis.x,
                axis.y,
                axis.z,
            );
        }
        Err(e) => println!("#{index}: {e}"),
    }
}

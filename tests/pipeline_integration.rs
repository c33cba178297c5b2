//! End-to-end tests for the preparation pipeline: synthetic annotation and
//! trace exports in, manifest + array artifacts out.

use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2};
use ndarray_npy::{read_npy, NpzReader};

use chromaprep::annotations::AnnotationError;
use chromaprep::dataset::{OutputMode, LABELS_FILENAME, MANIFEST_FILENAME, METADATA_FILENAME};
use chromaprep::labels::WindowParams;
use chromaprep::pipeline::{self, PipelineConfig, PipelineError};

/// Structured filename whose embedded replicate id is `rep101`: third
/// `_`-token of the first segment (`rep1`) plus the second segment's stem
/// from byte 10 (`01`).
const SOURCE_FILENAME: &str = "a_b_rep1%abcdefghij01.raw";
const REPLICATE: &str = "rep101";

fn annotation_csv(rows: &[(&str, &str, &str, &str)]) -> String {
    let header = (0..17).map(|i| format!("col{i}")).collect::<Vec<_>>().join(",");
    let mut out = header + "\n";
    for (replicate, sequence, start, end) in rows {
        let mut cells = vec![""; 17];
        cells[2] = replicate;
        cells[13] = sequence;
        cells[15] = start;
        cells[16] = end;
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn trace_line(sequence: &str, charge: &str, times: &[f64], intensities: &[f32]) -> String {
    let times = times.iter().map(f64::to_string).collect::<Vec<_>>().join(",");
    let intensities = intensities.iter().map(f32::to_string).collect::<Vec<_>>().join(",");
    let mut cells = vec![String::new(); 10];
    cells[0] = SOURCE_FILENAME.to_string();
    cells[1] = sequence.to_string();
    cells[2] = charge.to_string();
    cells[8] = times;
    cells[9] = intensities;
    cells.join("\t")
}

fn trace_tsv(lines: &[String]) -> String {
    let header = (0..10).map(|i| format!("col{i}")).collect::<Vec<_>>().join("\t");
    let mut out = header + "\n";
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn write_inputs(dir: &Path, annotations: &str, traces: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let annotations_path = dir.join("annotations.csv");
    let traces_path = dir.join("traces.tsv");
    std::fs::write(&annotations_path, annotations).unwrap();
    std::fs::write(&traces_path, traces).unwrap();
    (annotations_path, traces_path)
}

fn label_vectors(path: &Path) -> Vec<Array1<u8>> {
    let mut npz = NpzReader::new(File::open(path).unwrap()).unwrap();
    let mut names = npz.names().unwrap();
    names.sort();
    names
        .iter()
        .map(|name| npz.by_name(name).unwrap())
        .collect()
}

#[test]
fn test_whole_sequential_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "10.0", "20.0")]);
    let times = [5.0, 10.0, 15.0, 20.0, 25.0];
    let traces = trace_tsv(&[
        trace_line("PEPA", "2", &times, &[1.0, 2.0, 3.0, 4.0, 5.0]),
        trace_line("PEPA", "2", &times, &[6.0, 7.0, 8.0, 9.0, 10.0]),
    ]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::WholeSequential,
        max_traces: 6,
        window: WindowParams::default(),
    };

    let stats = pipeline::run(&annotations_path, &traces_path, &out, &config).unwrap();
    assert_eq!(stats.rows_read, 2);
    assert_eq!(stats.groups_written, 1);
    assert_eq!(stats.dataset.samples_written, 1);

    // Transposed array: one row per time point, padded to 6 trace columns.
    let array: Array2<f32> = read_npy(out.join("PEPA_rep101_2.npy")).unwrap();
    assert_eq!(array.dim(), (5, 6));
    assert_eq!(array[[0, 0]], 1.0);
    assert_eq!(array[[4, 1]], 10.0);
    assert_eq!(array[[0, 2]], 0.0);

    // Closed-interval point labels over times [5, 10, 15, 20, 25].
    let labels = label_vectors(&out.join(LABELS_FILENAME));
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].to_vec(), vec![0, 1, 1, 1, 0]);

    let manifest = std::fs::read_to_string(out.join(MANIFEST_FILENAME)).unwrap();
    assert_eq!(manifest, "ID,Filename\n0,PEPA_rep101_2\n");

    assert!(out.join(METADATA_FILENAME).exists());
}

#[test]
fn test_grouping_with_cap_and_key_change() {
    // 7 rows of (PEPA, 1) then 2 rows of (PEPB, 1) with max_traces 6:
    // groups of 6, 1, and 2 real rows, manifest ids 0, 1, 2.
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[
        (REPLICATE, "PEPA", "1.0", "2.0"),
        (REPLICATE, "PEPB", "1.0", "2.0"),
    ]);

    let times = [0.0, 1.0, 2.0, 3.0];
    let mut rows = Vec::new();
    for _ in 0..7 {
        rows.push(trace_line("PEPA", "1", &times, &[1.0, 1.0, 1.0, 1.0]));
    }
    for _ in 0..2 {
        rows.push(trace_line("PEPB", "1", &times, &[2.0, 2.0, 2.0, 2.0]));
    }
    let (annotations_path, traces_path) =
        write_inputs(dir.path(), &annotations, &trace_tsv(&rows));

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::WholeWindowed,
        max_traces: 6,
        window: WindowParams {
            subsection_width: 2,
            step_size: 1,
            positive_percentage: 0.5,
        },
    };

    let stats = pipeline::run(&annotations_path, &traces_path, &out, &config).unwrap();
    assert_eq!(stats.groups_written, 3);

    let manifest = std::fs::read_to_string(out.join(MANIFEST_FILENAME)).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines[0], "ID,Filename");
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("0,PEPA_"));
    assert!(lines[2].starts_with("1,PEPA_"));
    assert!(lines[3].starts_with("2,PEPB_"));

    // The duplicate PEPA key gets a second artifact that overwrites the
    // first one's file name, so two .npy files exist for three manifest
    // rows; every array is padded to 6 rows.
    let array: Array2<f32> = read_npy(out.join("PEPA_rep101_1.npy")).unwrap();
    assert_eq!(array.dim(), (6, 4));
    let array: Array2<f32> = read_npy(out.join("PEPB_rep101_1.npy")).unwrap();
    assert_eq!(array.dim(), (6, 4));

    let labels = label_vectors(&out.join(LABELS_FILENAME));
    assert_eq!(labels.len(), 3);
    // Windowed labels: 3 windows over 4 points with width 2, step 1.
    assert!(labels.iter().all(|vector| vector.len() == 3));
}

#[test]
fn test_subsection_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "1.0", "3.0")]);
    // Point labels over times [0..5] with window [1, 3]: [0,1,1,1,0].
    let times = [0.0, 1.0, 2.0, 3.0, 4.0];
    let traces = trace_tsv(&[trace_line("PEPA", "2", &times, &[5.0, 6.0, 7.0, 8.0, 9.0])]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::Subsection,
        max_traces: 6,
        window: WindowParams {
            subsection_width: 3,
            step_size: 1,
            positive_percentage: 1.0,
        },
    };

    let stats = pipeline::run(&annotations_path, &traces_path, &out, &config).unwrap();
    assert_eq!(stats.groups_written, 1);
    assert_eq!(stats.dataset.samples_written, 3);

    // Only the fully-positive window [1,1,1] at offset 1 is labeled 1.
    let manifest = std::fs::read_to_string(out.join(MANIFEST_FILENAME)).unwrap();
    assert_eq!(
        manifest,
        "ID,Filename,Label\n\
         0,PEPA_rep101_2_0_to_2,0\n\
         1,PEPA_rep101_2_1_to_3,1\n\
         2,PEPA_rep101_2_2_to_4,0\n"
    );

    // Slices are (max_traces, width) and aligned with their offsets.
    let slice: Array2<f32> = read_npy(out.join("PEPA_rep101_2_1_to_3.npy")).unwrap();
    assert_eq!(slice.dim(), (6, 3));
    assert_eq!(slice[[0, 0]], 6.0);
    assert_eq!(slice[[0, 2]], 8.0);
    assert_eq!(slice[[1, 0]], 0.0);

    // No label archive in subsection mode; labels live in the manifest.
    assert!(!out.join(LABELS_FILENAME).exists());
}

#[test]
fn test_skipped_rows_never_group() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "1.0", "2.0")]);
    let times = [0.0, 1.0];
    let traces = trace_tsv(&[
        trace_line("PEPA", "2", &times, &[1.0, 2.0]),
        trace_line("#N/A", "2", &times, &[3.0, 4.0]),
        trace_line("PEPA", "2", &times, &[5.0, 6.0]),
    ]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::WholeSequential,
        max_traces: 6,
        window: WindowParams::default(),
    };

    let stats = pipeline::run(&annotations_path, &traces_path, &out, &config).unwrap();
    assert_eq!(stats.rows_read, 3);
    assert_eq!(stats.rows_skipped, 1);
    // The sentinel row is dropped before grouping, so both real rows land
    // in one group.
    assert_eq!(stats.groups_written, 1);
}

#[test]
fn test_missing_annotation_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "1.0", "2.0")]);
    let traces = trace_tsv(&[trace_line("UNSEEN", "2", &[0.0, 1.0], &[1.0, 2.0])]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::WholeSequential,
        max_traces: 6,
        window: WindowParams::default(),
    };

    let result = pipeline::run(&annotations_path, &traces_path, &out, &config);
    assert!(matches!(
        result,
        Err(PipelineError::AnnotationError(AnnotationError::NotFound { .. }))
    ));
}

#[test]
fn test_annotation_sentinel_yields_all_negative_labels() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "#N/A", "#N/A")]);
    let times = [5.0, 10.0, 15.0];
    let traces = trace_tsv(&[trace_line("PEPA", "2", &times, &[1.0, 2.0, 3.0])]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::WholeSequential,
        max_traces: 6,
        window: WindowParams::default(),
    };

    pipeline::run(&annotations_path, &traces_path, &out, &config).unwrap();

    let labels = label_vectors(&out.join(LABELS_FILENAME));
    assert_eq!(labels[0].to_vec(), vec![0, 0, 0]);
}

#[test]
fn test_sentinel_window_subsections_all_negative() {
    // A group whose annotation is the #N/A sentinel has zero positive
    // points; with a strictly positive threshold, every slice must be
    // labeled 0.
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "#N/A", "#N/A")]);
    let times = [0.0, 1.0, 2.0, 3.0, 4.0];
    let traces = trace_tsv(&[trace_line("PEPA", "2", &times, &[1.0, 2.0, 3.0, 4.0, 5.0])]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::Subsection,
        max_traces: 6,
        window: WindowParams {
            subsection_width: 3,
            step_size: 1,
            positive_percentage: 1.0,
        },
    };

    let stats = pipeline::run(&annotations_path, &traces_path, &out, &config).unwrap();
    assert_eq!(stats.dataset.samples_written, 3);

    let manifest = std::fs::read_to_string(out.join(MANIFEST_FILENAME)).unwrap();
    for line in manifest.lines().skip(1) {
        assert!(line.ends_with(",0"), "expected a negative label: {line}");
    }
}

#[test]
fn test_zero_step_size_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "1.0", "2.0")]);
    let traces = trace_tsv(&[trace_line("PEPA", "2", &[0.0, 1.0], &[1.0, 2.0])]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        mode: OutputMode::Subsection,
        max_traces: 6,
        window: WindowParams {
            subsection_width: 3,
            step_size: 0,
            positive_percentage: 1.0,
        },
    };

    let result = pipeline::run(&annotations_path, &traces_path, &out, &config);
    assert!(matches!(result, Err(PipelineError::InvalidWindowParams(_))));
    assert!(!out.exists(), "no output directory before validation passes");
}

#[test]
fn test_reruns_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[
        (REPLICATE, "PEPA", "1.0", "3.0"),
        (REPLICATE, "PEPB", "#N/A", "2.0"),
    ]);
    let times = [0.0, 1.0, 2.0, 3.0, 4.0];
    let traces = trace_tsv(&[
        trace_line("PEPA", "2", &times, &[1.0, 2.0, 3.0, 4.0, 5.0]),
        trace_line("PEPA", "2", &times, &[2.0, 3.0, 4.0, 5.0, 6.0]),
        trace_line("PEPB", "3", &times, &[9.0, 8.0, 7.0, 6.0, 5.0]),
    ]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let config = PipelineConfig {
        mode: OutputMode::Subsection,
        max_traces: 6,
        window: WindowParams {
            subsection_width: 3,
            step_size: 2,
            positive_percentage: 0.5,
        },
    };

    let out_a = dir.path().join("out_a");
    let out_b = dir.path().join("out_b");
    pipeline::run(&annotations_path, &traces_path, &out_a, &config).unwrap();
    pipeline::run(&annotations_path, &traces_path, &out_b, &config).unwrap();

    let manifest_a = std::fs::read(out_a.join(MANIFEST_FILENAME)).unwrap();
    let manifest_b = std::fs::read(out_b.join(MANIFEST_FILENAME)).unwrap();
    assert_eq!(manifest_a, manifest_b);

    for entry in std::fs::read_dir(&out_a).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(".npy") {
            let bytes_a = std::fs::read(entry.path()).unwrap();
            let bytes_b = std::fs::read(out_b.join(&name)).unwrap();
            assert_eq!(bytes_a, bytes_b, "artifact {name:?} differs between runs");
        }
    }
}

#[test]
fn test_malformed_trace_row_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let annotations = annotation_csv(&[(REPLICATE, "PEPA", "1.0", "2.0")]);
    // Intensity list shorter than the time list.
    let mut cells = vec![String::new(); 10];
    cells[0] = SOURCE_FILENAME.to_string();
    cells[1] = "PEPA".to_string();
    cells[2] = "2".to_string();
    cells[8] = "0.0,1.0,2.0".to_string();
    cells[9] = "1.0,2.0".to_string();
    let traces = trace_tsv(&[cells.join("\t")]);
    let (annotations_path, traces_path) = write_inputs(dir.path(), &annotations, &traces);

    let out = dir.path().join("out");
    let config = PipelineConfig::default();

    let result = pipeline::run(&annotations_path, &traces_path, &out, &config);
    assert!(matches!(result, Err(PipelineError::TraceError(_))));
}

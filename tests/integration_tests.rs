//! Integration tests for the binary classifier module

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use em_binary_classifier::ml::model::{LinearModel, MlpModel, SerializedModel};
use em_binary_classifier::{
    get_results, get_results_with, initialize, BinaryClassifierModule, Classifier, ModelArtifact,
    ModuleConfig, ModuleError,
};
use em_binary_classifier::features::FeatureMatrix;
use rustfft::num_complex::Complex;

const SAMPLE_RATE: f32 = 32000.0;

/// Write complex64 samples as a v1 NPY file
fn write_npy(path: &Path, samples: &[Complex<f32>]) {
    let mut dict = format!(
        "{{'descr': '<c8', 'fortran_order': False, 'shape': ({},), }}",
        samples.len()
    );
    let pad = (64 - (10 + dict.len() + 1) % 64) % 64;
    dict.push_str(&" ".repeat(pad));
    dict.push('\n');

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"\x93NUMPY\x01\x00");
    bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    bytes.extend_from_slice(dict.as_bytes());
    for s in samples {
        bytes.extend_from_slice(&s.re.to_le_bytes());
        bytes.extend_from_slice(&s.im.to_le_bytes());
    }
    std::fs::write(path, bytes).unwrap();
}

/// Complex tone at `freq_hz` (negative for below the centre frequency)
fn tone(seconds: f32, freq_hz: f32) -> Vec<Complex<f32>> {
    let n = (seconds * SAMPLE_RATE) as usize;
    (0..n)
        .map(|i| Complex::from_polar(1.0, 2.0 * PI * freq_hz * i as f32 / SAMPLE_RATE))
        .collect()
}

/// Install `model` under `<modules_root>/binary-classifier/ml-model.json`
fn install_model(modules_root: &Path, model: &ModelArtifact) {
    let dir = modules_root.join("binary-classifier");
    std::fs::create_dir_all(&dir).unwrap();
    model.save(&dir.join("ml-model.json")).unwrap();
}

fn constant_model(label: &str) -> ModelArtifact {
    ModelArtifact::new(SerializedModel::Constant {
        label: label.to_string(),
    })
}

/// Linear model that separates a +4 kHz tone (feature 31) from a -4 kHz tone (feature 18)
fn tone_sign_model() -> ModelArtifact {
    let mut weights = vec![0.0; 50];
    weights[31] = 1.0;
    weights[18] = -1.0;
    ModelArtifact::new(SerializedModel::Linear(LinearModel {
        weights,
        intercept: 0.0,
        classes: ["benign".to_string(), "malicious".to_string()],
    }))
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn modules_root(&self) -> PathBuf {
        self.path("modules")
    }

    fn results_root(&self) -> PathBuf {
        self.path("out")
    }

    fn trace(&self, name: &str, samples: &[Complex<f32>]) -> PathBuf {
        let path = self.path(name);
        write_npy(&path, samples);
        path
    }

    fn configure(&self, module_id: i64, trace: &Path) -> ModuleConfig {
        initialize(module_id, trace, self.results_root())
            .unwrap()
            .with_modules_root(self.modules_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_results_directory() {
        let fx = Fixture::new();
        let root = fx.path("deep/nested/out");

        let config = initialize("12", "trace.npy", &root).unwrap();

        assert_eq!(config.module_id(), 12);
        assert!(root.join("12").is_dir());
        assert_eq!(config.results_dir(), root.join("12"));
    }

    #[test]
    fn test_initialize_zero_padded_id() {
        let fx = Fixture::new();
        let config = initialize("007", "trace.npy", fx.results_root()).unwrap();

        assert_eq!(config.module_id(), 7);
        assert!(fx.results_root().join("007").is_dir());
        assert!(!fx.results_root().join("7").exists());
    }

    #[test]
    fn test_initialize_existing_directory_is_ok() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.results_root().join("4")).unwrap();
        assert!(initialize(4, "trace.npy", fx.results_root()).is_ok());
        assert!(initialize(4, "trace.npy", fx.results_root()).is_ok());
    }

    #[test]
    fn test_initialize_non_integer_id_creates_nothing() {
        let fx = Fixture::new();
        let result = initialize("abc", "trace.npy", fx.results_root());

        assert!(matches!(result, Err(ModuleError::Configuration(_))));
        assert!(!fx.results_root().exists());
    }

    #[test]
    fn test_end_to_end_benign() {
        let fx = Fixture::new();
        install_model(&fx.modules_root(), &constant_model("benign"));
        let trace = fx.trace("trace1.npy", &tone(1.0, 1000.0));

        let config = fx.configure(1, &trace);
        let summary = get_results(&config).unwrap();

        assert_eq!(summary, "Classification: benign");
        let written = std::fs::read_to_string(fx.results_root().join("1/results.txt")).unwrap();
        assert_eq!(written, "Classification Result: benign");
    }

    #[test]
    fn test_repeated_results_are_identical() {
        let fx = Fixture::new();
        install_model(&fx.modules_root(), &tone_sign_model());
        let trace = fx.trace("trace.npy", &tone(0.5, 4000.0));
        let config = fx.configure(2, &trace);
        let results_file = config.results_dir().join("results.txt");

        let first = get_results(&config).unwrap();
        let first_bytes = std::fs::read(&results_file).unwrap();
        let second = get_results(&config).unwrap();
        let second_bytes = std::fs::read(&results_file).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first_bytes, b"Classification Result: malicious");
    }

    #[test]
    fn test_linear_model_separates_tones() {
        let fx = Fixture::new();
        install_model(&fx.modules_root(), &tone_sign_model());

        let above = fx.trace("above.npy", &tone(1.0, 4000.0));
        let below = fx.trace("below.npy", &tone(1.0, -4000.0));

        assert_eq!(
            get_results(&fx.configure(1, &above)).unwrap(),
            "Classification: malicious"
        );
        assert_eq!(
            get_results(&fx.configure(2, &below)).unwrap(),
            "Classification: benign"
        );
    }

    #[test]
    fn test_missing_model_writes_nothing() {
        let fx = Fixture::new();
        let trace = fx.trace("trace.npy", &tone(1.0, 1000.0));
        let config = fx.configure(3, &trace);

        let result = get_results(&config);

        assert!(matches!(result, Err(ModuleError::ModelLoad(_))));
        assert!(!config.results_dir().join("results.txt").exists());
    }

    #[test]
    fn test_corrupt_model_writes_nothing() {
        let fx = Fixture::new();
        let dir = fx.modules_root().join("binary-classifier");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ml-model.json"), b"\x80\x04\x95 pickled bytes").unwrap();
        let trace = fx.trace("trace.npy", &tone(1.0, 1000.0));
        let config = fx.configure(3, &trace);

        assert!(matches!(get_results(&config), Err(ModuleError::ModelLoad(_))));
        assert!(!config.results_dir().join("results.txt").exists());
    }

    #[test]
    fn test_missing_trace_writes_nothing() {
        let fx = Fixture::new();
        install_model(&fx.modules_root(), &constant_model("benign"));
        let config = fx.configure(4, &fx.path("does-not-exist.npy"));

        let result = get_results(&config);

        assert!(matches!(result, Err(ModuleError::TraceLoad(_))));
        assert!(!config.results_dir().join("results.txt").exists());
    }

    #[test]
    fn test_oversized_npy_shape_writes_nothing() {
        let fx = Fixture::new();
        let dict =
            "{'descr': '<c8', 'fortran_order': False, 'shape': (4611686018427387904, 8), }\n";
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        bytes.extend_from_slice(dict.as_bytes());
        let trace = fx.path("hostile.npy");
        std::fs::write(&trace, bytes).unwrap();
        let config = fx.configure(8, &trace);

        let result = get_results_with(&config, &constant_model("benign"));

        assert!(matches!(result, Err(ModuleError::TraceLoad(_))));
        assert!(!config.results_dir().join("results.txt").exists());
    }

    #[test]
    fn test_layerless_model_is_an_error() {
        let fx = Fixture::new();
        let trace = fx.trace("trace.npy", &tone(0.3, 1000.0));
        let config = fx.configure(9, &trace);
        let model = ModelArtifact::new(SerializedModel::Mlp(MlpModel {
            layers: vec![],
            classes: ["benign".to_string(), "malicious".to_string()],
        }));

        let result = get_results_with(&config, &model);

        assert!(matches!(result, Err(ModuleError::Prediction(_))));
        assert!(!config.results_dir().join("results.txt").exists());
    }

    #[test]
    fn test_short_trace_writes_nothing() {
        let fx = Fixture::new();
        install_model(&fx.modules_root(), &constant_model("benign"));
        let trace = fx.trace("short.npy", &tone(0.05, 1000.0));
        let config = fx.configure(5, &trace);

        let result = get_results(&config);

        assert!(matches!(result, Err(ModuleError::FeatureExtraction(_))));
        assert!(!config.results_dir().join("results.txt").exists());
    }

    #[test]
    fn test_results_with_injected_classifier() {
        struct AlwaysMalicious;
        impl Classifier for AlwaysMalicious {
            fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ModuleError> {
                assert_eq!(features.width(), 50);
                Ok(vec!["malicious".to_string(); features.rows()])
            }
        }

        let fx = Fixture::new();
        let trace = fx.trace("trace.npy", &tone(0.3, 2000.0));
        let config = fx.configure(6, &trace);

        let summary = get_results_with(&config, &AlwaysMalicious).unwrap();
        assert_eq!(summary, "Classification: malicious");
    }

    #[test]
    fn test_stateful_module_lifecycle() {
        let fx = Fixture::new();
        install_model(&fx.modules_root(), &constant_model("benign"));
        let trace = fx.trace("trace.npy", &tone(1.0, 1000.0));

        let mut module = BinaryClassifierModule::with_modules_root(fx.modules_root());
        assert!(matches!(module.get_results(), Err(ModuleError::NotInitialized)));

        module.initialize("7", &trace, fx.results_root()).unwrap();
        assert_eq!(module.get_results().unwrap(), "Classification: benign");
        assert!(fx.results_root().join("7/results.txt").is_file());
    }
}

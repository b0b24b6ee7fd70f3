//! Calendar enrichment: attaches a base64 track map to every F1 calendar
//! session held at a known circuit.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Circuit name as it appears in the calendar, and the file under the tracks
/// directory holding its base64 image.
pub const KNOWN_TRACKS: [(&str, &str); 24] = [
    ("Albert Park Circuit", "australia.txt"),
    ("Shanghai International Circuit", "china.txt"),
    ("Suzuka Circuit", "japan.txt"),
    ("Bahrain International Circuit", "bahrain.txt"),
    ("Jeddah Corniche Circuit", "jeddah.txt"),
    ("Miami International Autodrome", "miami.txt"),
    ("Circuit Gilles Villeneuve", "canada.txt"),
    ("Circuit de Monaco", "monaco.txt"),
    ("Circuit de Barcelona-Catalunya", "barcalona.txt"),
    ("Red Bull Ring", "redbullring.txt"),
    ("Silverstone Circuit", "silverstone.txt"),
    ("Circuit de Spa-Francorchamps", "spa.txt"),
    ("Hungaroring", "hungary.txt"),
    ("Circuit Zandvoort", "zandvoort.txt"),
    ("Autodromo Nazionale Monza", "monza.txt"),
    ("Madrid Street Circuit", "madrid.txt"),
    ("Baku City Circuit", "baku.txt"),
    ("Marina Bay Street Circuit", "singapore.txt"),
    ("Circuit of the Americas", "cota.txt"),
    ("Autódromo Hermanos Rodríguez", "mexico.txt"),
    ("Autódromo José Carlos Pace", "brazil.txt"),
    ("Las Vegas Street Circuit", "vegas.txt"),
    ("Lusail International Circuit", "qatar.txt"),
    ("Yas Marina Circuit", "abu.txt"),
];

/// Circuit name → base64 track image.
#[derive(Debug, Clone, Default)]
pub struct TrackMap {
    tracks: HashMap<String, String>,
}

impl TrackMap {
    /// Read every known track file from `dir`. A missing file aborts the load.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut tracks = HashMap::with_capacity(KNOWN_TRACKS.len());
        for (circuit, file) in KNOWN_TRACKS {
            let path = dir.join(file);
            let encoded = fs::read_to_string(&path)
                .with_context(|| format!("reading track for {circuit} from {}", path.display()))?
                .trim()
                .to_string();

            if STANDARD.decode(&encoded).is_err() {
                warn!(%circuit, path = %path.display(), "Track file is not valid base64");
            }
            debug!(%circuit, bytes = encoded.len(), "Loaded track");
            tracks.insert(circuit.to_string(), encoded);
        }
        Ok(Self { tracks })
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tracks: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, circuit: &str) -> Option<&str> {
        self.tracks.get(circuit).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Set `track` on every session whose `circuit` is known. Returns how many
/// sessions were enriched.
pub fn enrich(sessions: &mut [Value], tracks: &TrackMap) -> usize {
    let mut enriched = 0;
    for session in sessions.iter_mut() {
        let Value::Object(fields) = session else {
            continue;
        };
        let track = fields
            .get("circuit")
            .and_then(Value::as_str)
            .and_then(|circuit| tracks.get(circuit));

        if let Some(track) = track {
            let track = Value::String(track.to_string());
            fields.insert("track".to_string(), track);
            enriched += 1;
        }
    }
    enriched
}

/// Pretty JSON with two-space indentation and literal non-ASCII text.
pub fn render(calendar: &Value) -> Result<String> {
    serde_json::to_string_pretty(calendar).context("serializing calendar")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichReport {
    pub sessions: usize,
    pub enriched: usize,
}

pub fn enrich_file(input: &Path, output: &Path, tracks_dir: &Path) -> Result<EnrichReport> {
    let tracks = TrackMap::load(tracks_dir)?;

    let raw = fs::read_to_string(input)
        .with_context(|| format!("reading calendar {}", input.display()))?;
    let mut calendar: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing calendar {}", input.display()))?;
    let sessions = calendar
        .as_array_mut()
        .ok_or_else(|| anyhow!("{} must contain a JSON array", input.display()))?;

    let report = EnrichReport {
        sessions: sessions.len(),
        enriched: enrich(sessions, &tracks),
    };

    fs::write(output, render(&calendar)?)
        .with_context(|| format!("writing calendar {}", output.display()))?;
    info!(
        sessions = report.sessions,
        enriched = report.enriched,
        output = %output.display(),
        "Calendar enriched"
    );
    Ok(report)
}

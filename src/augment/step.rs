//! Typed augmentation steps and their parameter parsing

use std::collections::BTreeMap;
use std::fmt;

use crate::audio::ResampleMethod;
use crate::transforms::{FreqResponse, LoudnessGroup, PeakBand, WindNoiseParams};
use super::value::{parse_value, Value};

/// Prefix of the dash-form bandwidth step, `bandwidth_limitation-<method>-><rate>`.
const BANDWIDTH_PREFIX: &str = "bandwidth_limitation-";

/// One degradation in a recipe.
#[derive(Debug, Clone, PartialEq)]
pub enum AugmentationStep {
    /// `none` or an empty step
    None,
    LoudnessTransition(Vec<LoudnessGroup>),
    WindNoise(WindNoiseParams),
    BandwidthLimitation { method: ResampleMethod, target_rate: u32 },
    Clipping { min_quantile: f64, max_quantile: f64 },
    NonflatFreqResponse(FreqResponse),
    Codec { vbr_quality: f64 },
    PacketLoss { indices: Vec<usize>, packet_duration_ms: u32 },
}

impl AugmentationStep {
    pub fn name(&self) -> &'static str {
        match self {
            AugmentationStep::None => "none",
            AugmentationStep::LoudnessTransition(_) => "loudness_transition",
            AugmentationStep::WindNoise(_) => "wind_noise",
            AugmentationStep::BandwidthLimitation { .. } => "bandwidth_limitation",
            AugmentationStep::Clipping { .. } => "clipping",
            AugmentationStep::NonflatFreqResponse(_) => "nonflat_freq_res",
            AugmentationStep::Codec { .. } => "codec",
            AugmentationStep::PacketLoss { .. } => "packet_loss",
        }
    }

    /// Steps applied to the noisy signal after the noise has been mixed in.
    pub fn is_secondary(&self) -> bool {
        !matches!(
            self,
            AugmentationStep::None | AugmentationStep::LoudnessTransition(_) | AugmentationStep::WindNoise(_)
        )
    }

    /// Parse a single step. The error is a human-readable reason.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let text = text.trim();
        if text.is_empty() || text == "none" {
            return Ok(AugmentationStep::None);
        }
        if let Some(rest) = text.strip_prefix(BANDWIDTH_PREFIX) {
            return parse_dash_bandwidth(rest);
        }

        let (name, mut params) = match text.find('(') {
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| "missing closing `)`".to_string())?;
                (text[..open].trim(), Params::parse(inner)?)
            }
            None => (text, Params::default()),
        };

        let step = match name {
            "none" if params.is_empty() => AugmentationStep::None,
            "loudness_transition" => parse_loudness(&mut params)?,
            "wind_noise" => parse_wind(&mut params)?,
            "bandwidth_limitation" => {
                let method = params.method("res_type")?;
                let target_rate = params.positive_u32("fs_new")?;
                AugmentationStep::BandwidthLimitation { method, target_rate }
            }
            "clipping" => {
                let min_quantile = params.number("min")?;
                let max_quantile = params.number("max")?;
                if !(0.0..=1.0).contains(&min_quantile) || !(0.0..=1.0).contains(&max_quantile) {
                    return Err("quantiles must lie in [0, 1]".to_string());
                }
                if min_quantile > max_quantile {
                    return Err(format!("min ({}) exceeds max ({})", min_quantile, max_quantile));
                }
                AugmentationStep::Clipping { min_quantile, max_quantile }
            }
            "nonflat_freq_res" => parse_freq_response(&mut params)?,
            "codec" => {
                let vbr_quality = params.number("vbr_quality")?;
                if !(0.0..=10.0).contains(&vbr_quality) {
                    return Err(format!("vbr_quality {} outside [0, 10]", vbr_quality));
                }
                AugmentationStep::Codec { vbr_quality }
            }
            "packet_loss" => {
                let indices = params.index_list("packet_loss_indices")?;
                let packet_duration_ms = params.positive_u32("packet_duration_ms")?;
                AugmentationStep::PacketLoss { indices, packet_duration_ms }
            }
            other => return Err(format!("unknown step `{}`", other)),
        };
        params.finish()?;
        Ok(step)
    }
}

fn parse_dash_bandwidth(rest: &str) -> std::result::Result<AugmentationStep, String> {
    let (method, rate) = rest
        .rsplit_once("->")
        .ok_or_else(|| "expected `bandwidth_limitation-<method>-><rate>`".to_string())?;
    let method = method.trim().parse::<ResampleMethod>().map_err(|_| format!("unknown resampling method `{}`", method))?;
    let target_rate = rate
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|&r| r > 0)
        .ok_or_else(|| format!("invalid target rate `{}`", rate))?;
    Ok(AugmentationStep::BandwidthLimitation { method, target_rate })
}

fn parse_loudness(params: &mut Params) -> std::result::Result<AugmentationStep, String> {
    let start = params.index_list("start")?;
    let peak = params.index_list("peak")?;
    let end = params.index_list("end")?;
    let gain_db = params.number_list("gain_db")?;

    if peak.len() != start.len() || end.len() != start.len() || gain_db.len() != start.len() {
        return Err(format!(
            "start, peak, end and gain_db must have equal lengths, got {}, {}, {}, {}",
            start.len(), peak.len(), end.len(), gain_db.len()
        ));
    }

    let mut groups = Vec::with_capacity(start.len());
    for i in 0..start.len() {
        if !(start[i] <= peak[i] && peak[i] <= end[i]) {
            return Err(format!(
                "group {} needs start <= peak <= end, got {} / {} / {}",
                i, start[i], peak[i], end[i]
            ));
        }
        groups.push(LoudnessGroup { start: start[i], peak: peak[i], end: end[i], gain_db: gain_db[i] });
    }
    Ok(AugmentationStep::LoudnessTransition(groups))
}

fn parse_wind(params: &mut Params) -> std::result::Result<AugmentationStep, String> {
    let wind = WindNoiseParams {
        threshold: params.number("threshold")?,
        ratio: params.number("ratio")?,
        attack: params.number("attack")?,
        release: params.number("release")?,
        sc_gain: params.number("sc_gain")?,
        clipping: params.boolean("clipping")?,
        clipping_threshold: params.number("clipping_threshold")?,
    };
    if wind.threshold <= 0.0 {
        return Err("threshold must be positive".to_string());
    }
    if wind.ratio < 1.0 {
        return Err(format!("ratio {} must be at least 1", wind.ratio));
    }
    if wind.attack <= 0.0 || wind.release <= 0.0 {
        return Err("attack and release must be positive".to_string());
    }
    if wind.sc_gain <= 0.0 {
        return Err("sc_gain must be positive".to_string());
    }
    if !(0.0..=1.0).contains(&wind.clipping_threshold) {
        return Err(format!("clipping_threshold {} outside [0, 1]", wind.clipping_threshold));
    }
    Ok(AugmentationStep::WindNoise(wind))
}

fn parse_freq_response(params: &mut Params) -> std::result::Result<AugmentationStep, String> {
    let low_shelf_hz = params.number("low_shelf_hz")?;
    let high_shelf_hz = params.number("high_shelf_hz")?;
    let low_shelf_db = params.number("low_shelf_db")?;
    let high_shelf_db = params.number("high_shelf_db")?;
    let peak_hz = params.number_list("peak_hz")?;
    let peak_db = params.number_list("peak_db")?;

    if peak_hz.len() != peak_db.len() {
        return Err(format!(
            "peak_hz and peak_db must have equal lengths, got {} and {}",
            peak_hz.len(), peak_db.len()
        ));
    }
    if let Some(hz) = [low_shelf_hz, high_shelf_hz].iter().chain(peak_hz.iter()).find(|&&hz| hz <= 0.0) {
        return Err(format!("filter frequency {} Hz must be positive", hz));
    }

    let peaks = peak_hz.into_iter().zip(peak_db).map(|(hz, db)| PeakBand { hz, db }).collect();
    Ok(AugmentationStep::NonflatFreqResponse(FreqResponse {
        low_shelf_hz,
        high_shelf_hz,
        low_shelf_db,
        high_shelf_db,
        peaks,
    }))
}

/// `key=value` pairs of one step, consumed as they are read.
#[derive(Debug, Default)]
struct Params {
    values: BTreeMap<String, Value>,
}

impl Params {
    fn parse(inner: &str) -> std::result::Result<Self, String> {
        let mut values = BTreeMap::new();
        if inner.trim().is_empty() {
            return Ok(Self { values });
        }
        for pair in split_top_level(inner)? {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected `key=value`, found `{}`", pair.trim()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("missing parameter name in `{}`", pair.trim()));
            }
            let value = parse_value(raw).map_err(|e| format!("parameter `{}`: {}", key, e))?;
            if values.insert(key.to_string(), value).is_some() {
                return Err(format!("duplicate parameter `{}`", key));
            }
        }
        Ok(Self { values })
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&mut self, key: &str) -> std::result::Result<Value, String> {
        self.values.remove(key).ok_or_else(|| format!("missing parameter `{}`", key))
    }

    fn number(&mut self, key: &str) -> std::result::Result<f64, String> {
        match self.take(key)? {
            Value::Number(n) => Ok(n),
            other => Err(format!("parameter `{}` expects a number, found {}", key, other.type_name())),
        }
    }

    fn boolean(&mut self, key: &str) -> std::result::Result<bool, String> {
        match self.take(key)? {
            Value::Bool(b) => Ok(b),
            Value::Number(n) if n == 0.0 || n == 1.0 => Ok(n == 1.0),
            other => Err(format!("parameter `{}` expects a boolean, found `{}`", key, other)),
        }
    }

    fn method(&mut self, key: &str) -> std::result::Result<ResampleMethod, String> {
        match self.take(key)? {
            Value::Ident(name) => name.parse().map_err(|_| format!("unknown resampling method `{}`", name)),
            other => Err(format!("parameter `{}` expects a method name, found {}", key, other.type_name())),
        }
    }

    fn positive_u32(&mut self, key: &str) -> std::result::Result<u32, String> {
        let n = self.number(key)?;
        if n < 1.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return Err(format!("parameter `{}` expects a positive integer, found {}", key, n));
        }
        Ok(n as u32)
    }

    /// A list of numbers; a lone scalar counts as a one-element list.
    fn number_list(&mut self, key: &str) -> std::result::Result<Vec<f64>, String> {
        let items = match self.take(key)? {
            Value::List(items) => items,
            scalar => vec![scalar],
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Number(n) => Ok(n),
                other => Err(format!("parameter `{}` expects numbers, found {}", key, other.type_name())),
            })
            .collect()
    }

    fn index_list(&mut self, key: &str) -> std::result::Result<Vec<usize>, String> {
        self.number_list(key)?
            .into_iter()
            .map(|n| {
                if n < 0.0 || n.fract() != 0.0 {
                    Err(format!("parameter `{}` expects non-negative integers, found {}", key, n))
                } else {
                    Ok(n as usize)
                }
            })
            .collect()
    }

    /// Anything left over was not recognized by the step.
    fn finish(self) -> std::result::Result<(), String> {
        match self.values.keys().next() {
            Some(key) => Err(format!("unknown parameter `{}`", key)),
            None => Ok(()),
        }
    }
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(input: &str) -> std::result::Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(format!("unbalanced `{}`", c));
                }
            }
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced brackets".to_string());
    }
    parts.push(&input[start..]);
    Ok(parts)
}

struct Numbers<'a, T>(&'a [T]);

impl<T: fmt::Display> fmt::Display for Numbers<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", n)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for AugmentationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AugmentationStep::None => f.write_str("none"),
            AugmentationStep::LoudnessTransition(groups) => {
                let start: Vec<usize> = groups.iter().map(|g| g.start).collect();
                let peak: Vec<usize> = groups.iter().map(|g| g.peak).collect();
                let end: Vec<usize> = groups.iter().map(|g| g.end).collect();
                let gain: Vec<f64> = groups.iter().map(|g| g.gain_db).collect();
                write!(
                    f,
                    "loudness_transition(start={},peak={},end={},gain_db={})",
                    Numbers(&start), Numbers(&peak), Numbers(&end), Numbers(&gain)
                )
            }
            AugmentationStep::WindNoise(p) => write!(
                f,
                "wind_noise(threshold={},ratio={},attack={},release={},sc_gain={},clipping={},clipping_threshold={})",
                p.threshold,
                p.ratio,
                p.attack,
                p.release,
                p.sc_gain,
                if p.clipping { "True" } else { "False" },
                p.clipping_threshold
            ),
            AugmentationStep::BandwidthLimitation { method, target_rate } => {
                write!(f, "{}{}->{}", BANDWIDTH_PREFIX, method.name(), target_rate)
            }
            AugmentationStep::Clipping { min_quantile, max_quantile } => {
                write!(f, "clipping(min={},max={})", min_quantile, max_quantile)
            }
            AugmentationStep::NonflatFreqResponse(r) => {
                let hz: Vec<f64> = r.peaks.iter().map(|p| p.hz).collect();
                let db: Vec<f64> = r.peaks.iter().map(|p| p.db).collect();
                write!(
                    f,
                    "nonflat_freq_res(low_shelf_hz={},high_shelf_hz={},low_shelf_db={},high_shelf_db={},peak_hz={},peak_db={})",
                    r.low_shelf_hz, r.high_shelf_hz, r.low_shelf_db, r.high_shelf_db, Numbers(&hz), Numbers(&db)
                )
            }
            AugmentationStep::Codec { vbr_quality } => write!(f, "codec(vbr_quality={})", vbr_quality),
            AugmentationStep::PacketLoss { indices, packet_duration_ms } => write!(
                f,
                "packet_loss(packet_loss_indices={},packet_duration_ms={})",
                Numbers(indices), packet_duration_ms
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_and_empty_steps() {
        assert_eq!(AugmentationStep::parse("").unwrap(), AugmentationStep::None);
        assert_eq!(AugmentationStep::parse(" none ").unwrap(), AugmentationStep::None);
        assert!(AugmentationStep::parse("reverb").is_err());
    }

    #[test]
    fn test_bandwidth_forms_agree() {
        let dash = AugmentationStep::parse("bandwidth_limitation-soxr_hq->8000").unwrap();
        let call = AugmentationStep::parse("bandwidth_limitation(res_type=kaiser_best,fs_new=8000)").unwrap();
        assert_eq!(dash, call);
        assert_eq!(dash.to_string(), "bandwidth_limitation-kaiser_best->8000");

        assert!(AugmentationStep::parse("bandwidth_limitation-kaiser_best->0").is_err());
        assert!(AugmentationStep::parse("bandwidth_limitation-fancy->8000").is_err());
        assert!(AugmentationStep::parse("bandwidth_limitation-kaiser_best").is_err());
    }

    #[test]
    fn test_loudness_groups() {
        let step = AugmentationStep::parse("loudness_transition(start=[0, 100],peak=[50,200],end=[80,300],gain_db=[-6,3.5])").unwrap();
        match &step {
            AugmentationStep::LoudnessTransition(groups) => {
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[1], LoudnessGroup { start: 100, peak: 200, end: 300, gain_db: 3.5 });
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert!(!step.is_secondary());

        // Scalars are one-element lists.
        let single = AugmentationStep::parse("loudness_transition(start=10,peak=20,end=30,gain_db=6)").unwrap();
        assert_eq!(single, AugmentationStep::LoudnessTransition(vec![LoudnessGroup { start: 10, peak: 20, end: 30, gain_db: 6.0 }]));
    }

    #[test]
    fn test_loudness_validation() {
        assert!(AugmentationStep::parse("loudness_transition(start=[0,1],peak=[5],end=[9],gain_db=[1])").is_err());
        assert!(AugmentationStep::parse("loudness_transition(start=[10],peak=[5],end=[20],gain_db=[1])").is_err());
        assert!(AugmentationStep::parse("loudness_transition(start=[-1],peak=[5],end=[20],gain_db=[1])").is_err());
    }

    #[test]
    fn test_wind_noise_booleans() {
        let text = "wind_noise(threshold=0.1,ratio=8,attack=5,release=100,sc_gain=2,clipping=True,clipping_threshold=0.7)";
        let step = AugmentationStep::parse(text).unwrap();
        assert_eq!(step.to_string(), text);

        let off = AugmentationStep::parse(&text.replace("True", "False")).unwrap();
        match off {
            AugmentationStep::WindNoise(p) => assert!(!p.clipping),
            other => panic!("unexpected step {:?}", other),
        }
        assert!(AugmentationStep::parse(&text.replace("True", "maybe")).is_err());
        assert!(AugmentationStep::parse(&text.replace("ratio=8", "ratio=0.5")).is_err());
    }

    #[test]
    fn test_parameter_errors() {
        let missing = AugmentationStep::parse("clipping(min=0.1)").unwrap_err();
        assert!(missing.contains("max"));

        let unknown = AugmentationStep::parse("clipping(min=0.1,max=0.9,mode=hard)").unwrap_err();
        assert!(unknown.contains("mode"));

        let duplicate = AugmentationStep::parse("clipping(min=0.1,min=0.2,max=0.9)").unwrap_err();
        assert!(duplicate.contains("duplicate"));

        assert!(AugmentationStep::parse("clipping(min=0.9,max=0.1)").is_err());
        assert!(AugmentationStep::parse("codec(vbr_quality=11)").is_err());
        assert!(AugmentationStep::parse("codec(vbr_quality=[1])").is_err());
        assert!(AugmentationStep::parse("codec(vbr_quality=1").is_err());
        assert!(AugmentationStep::parse("packet_loss(packet_loss_indices=[1.5],packet_duration_ms=20)").is_err());
        assert!(AugmentationStep::parse("packet_loss(packet_loss_indices=[1],packet_duration_ms=0)").is_err());
    }

    #[test]
    fn test_freq_response_peaks() {
        let step = AugmentationStep::parse(
            "nonflat_freq_res(low_shelf_hz=100,high_shelf_hz=5000,low_shelf_db=-3,high_shelf_db=4.5,peak_hz=[800,2000],peak_db=[2,-1])",
        )
        .unwrap();
        match &step {
            AugmentationStep::NonflatFreqResponse(r) => {
                assert_eq!(r.peaks, vec![PeakBand { hz: 800.0, db: 2.0 }, PeakBand { hz: 2000.0, db: -1.0 }]);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert!(step.is_secondary());
        assert!(AugmentationStep::parse(
            "nonflat_freq_res(low_shelf_hz=100,high_shelf_hz=5000,low_shelf_db=0,high_shelf_db=0,peak_hz=[800],peak_db=[])"
        )
        .is_err());
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a=[1,2],b=(3,4),c=5").unwrap(), vec!["a=[1,2]", "b=(3,4)", "c=5"]);
        assert!(split_top_level("a=[1,2").is_err());
        assert!(split_top_level("a=1]").is_err());
    }
}

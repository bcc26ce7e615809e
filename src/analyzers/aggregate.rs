use crate::analyzers::types::{CoverageCell, GridCell};
use crate::analyzers::utility::{grid_key, mode_first_seen};
use crate::config::AnalysisConfig;
use crate::sample::{Sample, Tech};
use std::collections::BTreeMap;

/// Running sums for the samples falling into one grid cell.
#[derive(Debug, Default)]
struct CellAccumulator {
    count: usize,
    rsrp_sum: f64,
    lat_sum: f64,
    lon_sum: f64,
    snr_sum: f64,
    snr_count: usize,
    rsrq_sum: f64,
    rsrq_count: usize,
    // input order, for the first-seen tie-break of the modal PCI
    pcis: Vec<i64>,
}

/// Aggregated means of one cell.
struct CellMeans {
    rsrp: f64,
    snr: Option<f64>,
    rsrq: Option<f64>,
    lat: f64,
    lon: f64,
    pci: Option<i64>,
}

impl CellAccumulator {
    fn push(&mut self, s: &Sample) {
        self.count += 1;
        self.rsrp_sum += s.rsrp;
        self.lat_sum += s.lat;
        self.lon_sum += s.lon;

        if let Some(snr) = s.snr {
            self.snr_sum += snr;
            self.snr_count += 1;
        }
        if let Some(rsrq) = s.rsrq {
            self.rsrq_sum += rsrq;
            self.rsrq_count += 1;
        }
        if let Some(pci) = s.pci {
            self.pcis.push(pci);
        }
    }

    fn finish(self) -> CellMeans {
        let n = self.count as f64;
        let known_mean = |sum: f64, count: usize| (count > 0).then(|| sum / count as f64);

        CellMeans {
            rsrp: self.rsrp_sum / n,
            snr: known_mean(self.snr_sum, self.snr_count),
            rsrq: known_mean(self.rsrq_sum, self.rsrq_count),
            lat: self.lat_sum / n,
            lon: self.lon_sum / n,
            pci: mode_first_seen(self.pcis),
        }
    }
}

fn grid_coord(key: i64, places: u32) -> f64 {
    key as f64 / 10f64.powi(places as i32)
}

/// Per (cell, operator, technology) aggregation, ordered by cell then label.
pub fn aggregate_split(samples: &[Sample], config: &AnalysisConfig) -> Vec<GridCell> {
    let places = config.geo_precision;
    let mut cells: BTreeMap<(i64, i64, &str, Tech), CellAccumulator> = BTreeMap::new();

    for s in samples {
        let key = (
            grid_key(s.lat, places),
            grid_key(s.lon, places),
            s.operator.as_str(),
            s.tech,
        );
        cells.entry(key).or_default().push(s);
    }

    cells
        .into_iter()
        .map(|((glat, glon, operator, tech), acc)| {
            let m = acc.finish();
            GridCell {
                grid_lat: grid_coord(glat, places),
                grid_lon: grid_coord(glon, places),
                operator: operator.to_string(),
                tech,
                rsrp: m.rsrp,
                snr: m.snr,
                rsrq: m.rsrq,
                lat: m.lat,
                lon: m.lon,
                pci: m.pci,
            }
        })
        .collect()
}

/// Per (cell, operator) aggregation with technologies merged, giving each
/// operator one continuous coverage table.
pub fn aggregate_combined(samples: &[Sample], config: &AnalysisConfig) -> Vec<CoverageCell> {
    let places = config.geo_precision;
    let mut cells: BTreeMap<(i64, i64, &str), CellAccumulator> = BTreeMap::new();

    for s in samples {
        let key = (
            grid_key(s.lat, places),
            grid_key(s.lon, places),
            s.operator.as_str(),
        );
        cells.entry(key).or_default().push(s);
    }

    cells
        .into_iter()
        .map(|((glat, glon, operator), acc)| {
            let m = acc.finish();
            CoverageCell {
                grid_lat: grid_coord(glat, places),
                grid_lon: grid_coord(glon, places),
                operator: operator.to_string(),
                rsrp: m.rsrp,
                snr: m.snr,
                rsrq: m.rsrq,
                lat: m.lat,
                lon: m.lon,
                pci: m.pci,
            }
        })
        .collect()
}

/// Splits per-technology cells into one map per (operator, technology).
pub fn split_maps(cells: Vec<GridCell>) -> BTreeMap<(String, Tech), Vec<GridCell>> {
    let mut maps: BTreeMap<(String, Tech), Vec<GridCell>> = BTreeMap::new();
    for cell in cells {
        maps.entry((cell.operator.clone(), cell.tech))
            .or_default()
            .push(cell);
    }
    maps
}

/// Splits combined cells into one map per operator.
pub fn combined_maps(cells: Vec<CoverageCell>) -> BTreeMap<String, Vec<CoverageCell>> {
    let mut maps: BTreeMap<String, Vec<CoverageCell>> = BTreeMap::new();
    for cell in cells {
        maps.entry(cell.operator.clone()).or_default().push(cell);
    }
    maps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testutil::sample;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn test_nearby_samples_share_a_cell() {
        let samples = vec![
            sample("A1", 0, 42.00001, 23.00002, -90.0),
            sample("A1", 5, 42.00003, 23.00004, -100.0),
        ];
        let cells = aggregate_split(&samples, &config());

        assert_eq!(cells.len(), 1);
        let c = &cells[0];
        assert_eq!((c.grid_lat, c.grid_lon), (42.0, 23.0));
        assert_eq!(c.rsrp, -95.0);
        assert!((c.lat - 42.00002).abs() < 1e-12);
        assert!((c.lon - 23.00003).abs() < 1e-12);
        assert_eq!(c.tech, Tech::G4);
    }

    #[test]
    fn test_split_separates_technologies_combined_merges_them() {
        let mut nr = sample("A1", 1, 42.0, 23.0, -80.0);
        nr.tech = Tech::G5;
        let samples = vec![sample("A1", 0, 42.0, 23.0, -100.0), nr];

        assert_eq!(aggregate_split(&samples, &config()).len(), 2);
        let combined = aggregate_combined(&samples, &config());
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].rsrp, -90.0);
    }

    #[test]
    fn test_optional_metrics_average_known_values_only() {
        let mut a = sample("A1", 0, 42.0, 23.0, -90.0);
        a.snr = Some(10.0);
        let mut b = sample("A1", 1, 42.0, 23.0, -90.0);
        b.snr = Some(20.0);
        let c = sample("A1", 2, 42.0, 23.0, -90.0);

        let cells = aggregate_combined(&[a, b, c], &config());
        assert_eq!(cells[0].snr, Some(15.0));
        assert_eq!(cells[0].rsrq, None);
        assert_eq!(cells[0].pci, None);
    }

    #[test]
    fn test_modal_pci_tie_goes_to_first_seen() {
        let pcis = [Some(7), Some(3), None, Some(3), Some(7)];
        let samples: Vec<_> = pcis
            .iter()
            .enumerate()
            .map(|(i, pci)| {
                let mut s = sample("A1", i as i64, 42.0, 23.0, -90.0);
                s.pci = *pci;
                s
            })
            .collect();

        let cells = aggregate_split(&samples, &config());
        assert_eq!(cells[0].pci, Some(7));
    }

    #[test]
    fn test_order_invariance() {
        let mut samples: Vec<_> = (0..20)
            .map(|i| {
                let mut s = sample(
                    if i % 2 == 0 { "A1" } else { "YETTEL" },
                    i,
                    42.0 + (i % 3) as f64 * 0.0001,
                    23.0,
                    -80.0 - i as f64 * 1.7,
                );
                s.snr = Some(i as f64 * 0.3);
                s
            })
            .collect();
        let forward = aggregate_split(&samples, &config());
        samples.reverse();
        let backward = aggregate_split(&samples, &config());

        assert_eq!(forward.len(), backward.len());
        for (f, b) in forward.iter().zip(&backward) {
            assert_eq!((f.grid_lat, f.grid_lon, &f.operator), (b.grid_lat, b.grid_lon, &b.operator));
            assert!((f.rsrp - b.rsrp).abs() < 1e-9);
            assert!((f.snr.unwrap() - b.snr.unwrap()).abs() < 1e-9);
            assert!((f.lat - b.lat).abs() < 1e-9);
        }
    }

    #[test]
    fn test_maps_grouping() {
        let mut nr = sample("A1", 1, 42.0, 23.0, -80.0);
        nr.tech = Tech::G5;
        let samples = vec![
            sample("A1", 0, 42.0, 23.0, -100.0),
            nr,
            sample("YETTEL", 2, 42.0, 23.0, -90.0),
        ];

        let split = split_maps(aggregate_split(&samples, &config()));
        assert_eq!(split.len(), 3);
        assert!(split.contains_key(&("A1".to_string(), Tech::G5)));

        let combined = combined_maps(aggregate_combined(&samples, &config()));
        assert_eq!(combined.len(), 2);
        assert_eq!(combined["A1"].len(), 1);
    }
}

use crate::analyzers::types::{GhostReason, GroupVerdict, OperatorTechGroup};
use crate::config::{AnalysisConfig, SignificancePolicy};
use crate::sample::{Sample, Tech};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Counts samples and mean RSRP per (operator, technology), ordered by label.
pub fn operator_tech_groups(samples: &[Sample]) -> Vec<OperatorTechGroup> {
    let mut sums: BTreeMap<(&str, Tech), (usize, f64)> = BTreeMap::new();
    for s in samples {
        let entry = sums.entry((s.operator.as_str(), s.tech)).or_default();
        entry.0 += 1;
        entry.1 += s.rsrp;
    }

    sums.into_iter()
        .map(|((operator, tech), (count, rsrp_sum))| OperatorTechGroup {
            operator: operator.to_string(),
            tech,
            count,
            mean_rsrp: rsrp_sum / count as f64,
        })
        .collect()
}

/// Judges every group against the configured policy.
pub fn classify_groups(groups: Vec<OperatorTechGroup>, config: &AnalysisConfig) -> Vec<GroupVerdict> {
    let mut dominant: HashMap<String, usize> = HashMap::new();
    for g in &groups {
        let top = dominant.entry(g.operator.clone()).or_default();
        *top = (*top).max(g.count);
    }

    groups
        .into_iter()
        .map(|group| {
            let ghost = if group.count < config.min_samples_for_report {
                Some(GhostReason::TooFewSamples)
            } else if group.mean_rsrp < config.dead_zone_rsrp {
                Some(GhostReason::DeadZone)
            } else {
                match config.significance_policy {
                    SignificancePolicy::Absolute => None,
                    SignificancePolicy::RelativeToDominant { ratio, floor } => {
                        let top = dominant.get(&group.operator).copied().unwrap_or(0);
                        let share = group.count as f64 / top as f64;
                        (share <= ratio && group.count <= floor)
                            .then_some(GhostReason::MinorTechnology)
                    }
                }
            };
            GroupVerdict { group, ghost }
        })
        .collect()
}

/// Removes samples belonging to ghost technologies.
///
/// Returns the surviving samples and the verdict for every group.
pub fn filter_significant(
    samples: &[Sample],
    config: &AnalysisConfig,
) -> (Vec<Sample>, Vec<GroupVerdict>) {
    let verdicts = classify_groups(operator_tech_groups(samples), config);

    for v in verdicts.iter().filter(|v| !v.is_significant()) {
        warn!(
            operator = %v.group.operator,
            tech = %v.group.tech,
            count = v.group.count,
            mean_rsrp = v.group.mean_rsrp,
            reason = v.ghost.map(|r| r.describe()).unwrap_or_default(),
            "Excluding ghost technology"
        );
    }

    let keep: HashSet<(&str, Tech)> = verdicts
        .iter()
        .filter(|v| v.is_significant())
        .map(|v| (v.group.operator.as_str(), v.group.tech))
        .collect();

    let kept: Vec<Sample> = samples
        .iter()
        .filter(|s| keep.contains(&(s.operator.as_str(), s.tech)))
        .cloned()
        .collect();

    debug!(before = samples.len(), after = kept.len(), "Significance filter applied");
    (kept, verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testutil::sample_tech;

    fn samples(operator: &str, tech: Tech, n: usize, rsrp: f64) -> Vec<Sample> {
        (0..n)
            .map(|i| sample_tech(operator, tech, i as i64, rsrp))
            .collect()
    }

    #[test]
    fn test_groups_count_and_mean() {
        let mut all = samples("A1", Tech::G4, 2, -90.0);
        all.extend(samples("A1", Tech::G4, 2, -100.0));
        all.extend(samples("A1", Tech::G3, 1, -70.0));

        let groups = operator_tech_groups(&all);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].tech, Tech::G3);
        assert_eq!(groups[1].count, 4);
        assert_eq!(groups[1].mean_rsrp, -95.0);
    }

    #[test]
    fn test_small_group_excluded_even_if_excellent() {
        let mut all = samples("YETTEL", Tech::G4, 60, -95.0);
        all.extend(samples("YETTEL", Tech::G3, 10, -60.0));

        let (kept, verdicts) = filter_significant(&all, &AnalysisConfig::default());

        assert_eq!(kept.len(), 60);
        assert!(kept.iter().all(|s| s.tech == Tech::G4));
        let ghost = verdicts.iter().find(|v| v.group.tech == Tech::G3).unwrap();
        assert_eq!(ghost.ghost, Some(GhostReason::TooFewSamples));
    }

    #[test]
    fn test_dead_zone_group_excluded() {
        let all = samples("A1", Tech::G2, 80, -134.0);
        let (kept, verdicts) = filter_significant(&all, &AnalysisConfig::default());

        assert!(kept.is_empty());
        assert_eq!(verdicts[0].ghost, Some(GhostReason::DeadZone));
    }

    #[test]
    fn test_threshold_boundaries_are_kept() {
        let all = samples("A1", Tech::G4, 50, -130.0);
        let (kept, _) = filter_significant(&all, &AnalysisConfig::default());
        assert_eq!(kept.len(), 50);
    }

    #[test]
    fn test_relative_policy_drops_minor_technology() {
        let config = AnalysisConfig {
            significance_policy: SignificancePolicy::RelativeToDominant {
                ratio: 0.05,
                floor: 5000,
            },
            ..Default::default()
        };
        let mut all = samples("A1", Tech::G4, 2000, -95.0);
        all.extend(samples("A1", Tech::G3, 60, -90.0));
        all.extend(samples("A1", Tech::G5, 200, -90.0));

        let (kept, verdicts) = filter_significant(&all, &config);

        assert_eq!(kept.len(), 2200);
        let g3 = verdicts.iter().find(|v| v.group.tech == Tech::G3).unwrap();
        assert_eq!(g3.ghost, Some(GhostReason::MinorTechnology));
    }

    #[test]
    fn test_relative_policy_floor_rescues_large_group() {
        let config = AnalysisConfig {
            significance_policy: SignificancePolicy::RelativeToDominant {
                ratio: 0.5,
                floor: 100,
            },
            ..Default::default()
        };
        let mut all = samples("A1", Tech::G4, 1000, -95.0);
        all.extend(samples("A1", Tech::G3, 150, -90.0));

        let (kept, _) = filter_significant(&all, &config);
        assert_eq!(kept.len(), 1150);
    }

    #[test]
    fn test_absolute_policy_keeps_minor_technology() {
        let mut all = samples("A1", Tech::G4, 2000, -95.0);
        all.extend(samples("A1", Tech::G3, 60, -90.0));

        let (kept, _) = filter_significant(&all, &AnalysisConfig::default());
        assert_eq!(kept.len(), 2060);
    }
}

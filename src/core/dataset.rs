use std::f64::consts::PI;

/// Default survey size and seed used by the API server.
pub const DEFAULT_HOUSEHOLDS: usize = 4_096;
pub const DEFAULT_SEED: u64 = 20_260_101;

/// Target person count the survey weights scale to.
const POPULATION: f64 = 67_000_000.0;

/// One weighted survey household.
#[derive(Debug, Clone)]
pub struct HouseholdRecord {
    pub weight: f64,
    pub adult_ages: Vec<u32>,
    pub employment_incomes: Vec<f64>,
    pub children: u32,
    pub land_value: f64,
}

impl HouseholdRecord {
    pub fn people(&self) -> f64 {
        self.adult_ages.len() as f64 + self.children as f64
    }
}

/// A deterministic synthetic stand-in for a household survey: same seed,
/// same dataset, so simulation results are reproducible across runs.
#[derive(Debug, Clone)]
pub struct SurveyDataset {
    pub households: Vec<HouseholdRecord>,
}

impl SurveyDataset {
    pub fn synthetic(households: usize, seed: u64) -> Self {
        let mut rng = Rng::new(seed);
        let mut records = Vec::with_capacity(households);

        for _ in 0..households {
            let couple = rng.next_f64() < 0.55;
            let first_age = 18 + (rng.next_f64() * 73.0) as u32;
            let mut adult_ages = vec![first_age];
            if couple {
                let offset = (rng.next_f64() * 9.0) as i64 - 4;
                let second_age = (first_age as i64 + offset).clamp(18, 90) as u32;
                adult_ages.push(second_age);
            }

            let youngest = *adult_ages.iter().min().unwrap_or(&first_age);
            let children = if youngest < 55 {
                let draw = rng.next_f64();
                if draw < 0.45 {
                    0
                } else if draw < 0.70 {
                    1
                } else if draw < 0.90 {
                    2
                } else {
                    3
                }
            } else {
                0
            };

            let employment_incomes = adult_ages
                .iter()
                .map(|&age| {
                    if age >= 66 || rng.next_f64() < 0.15 {
                        0.0
                    } else {
                        (10.1 + 0.55 * rng.standard_normal()).exp().min(400_000.0)
                    }
                })
                .collect();

            let land_value = if rng.next_f64() < 0.35 {
                0.0
            } else {
                (12.2 + 0.6 * rng.standard_normal()).exp().min(3_000_000.0)
            };

            records.push(HouseholdRecord {
                weight: 0.5 + rng.next_f64(),
                adult_ages,
                employment_incomes,
                children,
                land_value,
            });
        }

        let weighted_people: f64 = records.iter().map(|r| r.weight * r.people()).sum();
        if weighted_people > 0.0 {
            let scale = POPULATION / weighted_people;
            for record in &mut records {
                record.weight *= scale;
            }
        }

        Self {
            households: records,
        }
    }
}

/// Deterministic xorshift generator with Box-Muller normals.
struct Rng {
    state: u64,
    cached_normal: Option<f64>,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Self {
            state,
            cached_normal: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        let z0 = r * theta.cos();
        let z1 = r * theta.sin();
        self.cached_normal = Some(z1);
        z0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_dataset() {
        let a = SurveyDataset::synthetic(256, 7);
        let b = SurveyDataset::synthetic(256, 7);
        assert_eq!(a.households.len(), b.households.len());
        for (x, y) in a.households.iter().zip(&b.households) {
            assert_eq!(x.weight, y.weight);
            assert_eq!(x.adult_ages, y.adult_ages);
            assert_eq!(x.employment_incomes, y.employment_incomes);
            assert_eq!(x.children, y.children);
            assert_eq!(x.land_value, y.land_value);
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = SurveyDataset::synthetic(256, 7);
        let b = SurveyDataset::synthetic(256, 8);
        let same = a
            .households
            .iter()
            .zip(&b.households)
            .all(|(x, y)| x.weight == y.weight && x.land_value == y.land_value);
        assert!(!same);
    }

    #[test]
    fn weights_scale_to_the_target_population() {
        let dataset = SurveyDataset::synthetic(1_024, 3);
        let people: f64 = dataset
            .households
            .iter()
            .map(|r| r.weight * r.people())
            .sum();
        assert!((people - 67_000_000.0).abs() < 1.0);
        assert!(dataset.households.iter().all(|r| r.weight > 0.0));
    }

    #[test]
    fn records_are_structurally_sane() {
        let dataset = SurveyDataset::synthetic(512, 11);
        for record in &dataset.households {
            assert!(!record.adult_ages.is_empty() && record.adult_ages.len() <= 2);
            assert_eq!(record.adult_ages.len(), record.employment_incomes.len());
            assert!(record.children <= 3);
            assert!(record.adult_ages.iter().all(|&age| (18..=90).contains(&age)));
            assert!(record.employment_incomes.iter().all(|v| *v >= 0.0));
            assert!(record.land_value >= 0.0);
        }
    }
}

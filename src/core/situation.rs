use super::error::PolicyError;
use super::reform::ParamMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Adult {
    pub age: u32,
    pub employment_income: f64,
}

/// A household description for individual-level simulation: one or two
/// adults, a child count and the household's land value.
#[derive(Debug, Clone, PartialEq)]
pub struct Situation {
    pub adults: Vec<Adult>,
    pub children: u32,
    pub land_value: f64,
}

impl Default for Situation {
    fn default() -> Self {
        Self {
            adults: vec![Adult {
                age: 35,
                employment_income: 0.0,
            }],
            children: 0,
            land_value: 0.0,
        }
    }
}

fn integer_lever(
    params: &ParamMap,
    lever: &str,
    min: u32,
    max: u32,
) -> Result<Option<u32>, PolicyError> {
    match params.get(lever) {
        None => Ok(None),
        Some(v) if v.is_finite() && v.fract() == 0.0 && *v >= min as f64 && *v <= max as f64 => {
            Ok(Some(*v as u32))
        }
        Some(_) => Err(PolicyError::invalid_lever(
            lever,
            format!("must be a whole number between {min} and {max}"),
        )),
    }
}

fn money_lever(params: &ParamMap, lever: &str) -> Result<Option<f64>, PolicyError> {
    match params.get(lever) {
        None => Ok(None),
        Some(v) if v.is_finite() && *v >= 0.0 => Ok(Some(*v)),
        Some(_) => Err(PolicyError::invalid_lever(lever, "must be >= 0")),
    }
}

/// Builds a household situation from client levers: `adults` (1 or 2),
/// `age_1`/`age_2`, `employment_income_1`/`employment_income_2`, `children`,
/// `land_value`. Keys belonging to the reform builder are ignored.
pub fn create_situation(params: &ParamMap) -> Result<Situation, PolicyError> {
    let adult_count = integer_lever(params, "adults", 1, 2)?.unwrap_or(1);
    let children = integer_lever(params, "children", 0, 8)?.unwrap_or(0);
    let land_value = money_lever(params, "land_value")?.unwrap_or(0.0);

    let mut adults = Vec::with_capacity(adult_count as usize);
    for index in 1..=adult_count {
        let age = integer_lever(params, &format!("age_{index}"), 16, 110)?.unwrap_or(35);
        let employment_income =
            money_lever(params, &format!("employment_income_{index}"))?.unwrap_or(0.0);
        adults.push(Adult {
            age,
            employment_income,
        });
    }

    Ok(Situation {
        adults,
        children,
        land_value,
    })
}

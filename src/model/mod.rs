pub mod bert;
pub mod config;

use std::sync::PoisonError;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};

pub use bert::BertForSequenceClassification;
pub use config::Config;

use crate::checkpoint::StateDict;
use crate::error::{Error, Result};

/// Builds an untrained classifier for `config` and copies `state_dict` into
/// it. Loading is strict: every model parameter must be present with the
/// same shape and every checkpoint entry must name a model parameter.
pub fn materialize_model(
    config: &Config,
    state_dict: StateDict,
    device: &Device,
) -> Result<BertForSequenceClassification> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = BertForSequenceClassification::load(vb, config)?;
    load_state_dict(&varmap, state_dict)?;
    Ok(model)
}

/// Overwrites the variables of `varmap` in place with `state_dict`.
pub fn load_state_dict(varmap: &VarMap, state_dict: StateDict) -> Result<()> {
    let vars = varmap.data().lock().unwrap_or_else(PoisonError::into_inner);

    let mut names: Vec<&String> = vars.keys().collect();
    names.sort();
    if let Some(missing) = names.into_iter().find(|name| !state_dict.contains_key(*name)) {
        return Err(Error::MissingParameter(missing.clone()));
    }

    for (name, tensor) in state_dict {
        let var = vars
            .get(&name)
            .ok_or_else(|| Error::UnexpectedParameter(name.clone()))?;
        if var.dims() != tensor.dims() {
            return Err(Error::ShapeMismatch {
                expected: var.dims().to_vec(),
                actual: tensor.dims().to_vec(),
                name,
            });
        }
        let tensor = tensor.to_dtype(var.dtype())?.to_device(var.device())?;
        var.set(&tensor)?;
    }
    Ok(())
}

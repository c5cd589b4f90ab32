use std::path::Path;

use crate::bootstrap::ModelfileDocument;
use crate::daemon::ModelControl;
use crate::error::{BootstrapError, Result};

/// Create `name` on the daemon from the document written at `path`.
///
/// Re-registering an existing name overwrites it; the daemon treats `create` as
/// last-write-wins.
pub async fn register<C>(
    control: &C,
    name: &str,
    document: &ModelfileDocument,
    path: &Path,
) -> Result<()>
where
    C: ModelControl + ?Sized,
{
    tracing::info!(
        model = name,
        base_model = %document.parameters().base_model,
        modelfile = %path.display(),
        "Registering model"
    );

    control
        .create_model(name, document, path)
        .await
        .map_err(|err| BootstrapError::ModelRegistrationFailed {
            model: name.to_string(),
            diagnostics: err.to_string(),
        })?;

    tracing::info!(model = name, "Model registered");
    Ok(())
}

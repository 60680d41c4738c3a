//! # CRD Generator
//!
//! Prints the `Project` and `SealedSecret` CustomResourceDefinitions as a
//! multi-document YAML stream.
//!
//! ```bash
//! cargo run -p crds --bin crdgen | kubectl apply -f -
//! ```

use crds::{Project, SealedSecret};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let documents = [
        serde_yaml::to_string(&Project::crd())?,
        serde_yaml::to_string(&SealedSecret::crd())?,
    ];
    print!("{}", documents.join("---\n"));
    Ok(())
}

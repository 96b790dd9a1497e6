//! 事故工具：查询与创建

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{Backend, IncidentFilter, NewIncident};
use crate::tools::schema::parameters_schema_for;
use crate::tools::{parse_args, Tool, ToolContext};

#[derive(Debug, Deserialize, JsonSchema)]
struct GetIncidentsArgs {
    /// Filtre sur le statut (ex. "ouvert", "resolu")
    statut: Option<String>,
    /// Filtre sur le projet
    projet_id: Option<String>,
    limit: Option<usize>,
}

/// get_incidents
pub struct GetIncidentsTool {
    backend: Arc<dyn Backend>,
}

impl GetIncidentsTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetIncidentsTool {
    fn name(&self) -> &str {
        "get_incidents"
    }

    fn description(&self) -> &str {
        "Liste les incidents (type, description, gravité, statut, projet, localisation), les plus récents d'abord."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<GetIncidentsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: GetIncidentsArgs = parse_args(args)?;
        let filter = IncidentFilter {
            statut: args.statut,
            projet_id: args.projet_id,
            limit: args.limit,
        };
        let incidents = self
            .backend
            .list_incidents(&filter)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(incidents).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateIncidentArgs {
    /// Type d'incident (securite, qualite, environnement, materiel, autre)
    type_incident: String,
    description: String,
    /// Gravité : faible, moyenne, haute, critique
    gravite: Option<String>,
    projet_id: Option<String>,
    localisation: Option<String>,
}

/// create_incident：以当前手机号作为上报人
pub struct CreateIncidentTool {
    backend: Arc<dyn Backend>,
}

impl CreateIncidentTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for CreateIncidentTool {
    fn name(&self) -> &str {
        "create_incident"
    }

    fn description(&self) -> &str {
        "Déclare un nouvel incident sur un chantier."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<CreateIncidentArgs>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, String> {
        let args: CreateIncidentArgs = parse_args(args)?;
        if args.description.trim().is_empty() {
            return Err("La description est obligatoire".into());
        }
        let incident = NewIncident {
            type_incident: args.type_incident,
            description: args.description,
            gravite: args.gravite,
            statut: "ouvert".into(),
            projet_id: args.projet_id,
            localisation: args.localisation,
            photo_url: None,
            signale_par: ctx.phone_number.clone(),
        };
        let created = self
            .backend
            .create_incident(incident)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(created).map_err(|e| e.to_string())
    }
}

//! Trust score profile resource
//!
//! A profile scores how trustworthy data about a node classification is,
//! from a weighted set of dimensions recalculated on a fixed schedule.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::models::{
    CreateTrustScoreProfileRequest, TrustScoreDimension, TrustScoreProfileResponse,
    UpdateTrustScoreProfileRequest,
};
use crate::api::ConfigClient;
use crate::convert::{
    flatten_optional_string, flatten_time, optional_string, update_optional_string, wire_enum,
    WireEnum,
};
use crate::diag::{Diagnostic, Diagnostics};
use crate::resources::{
    api_result, build_read_path, read_result, set_location_from, ManagedResource,
};
use crate::schema::common::{
    self, APP_SPACE_ID_KEY, CREATE_TIME_KEY, CUSTOMER_ID_KEY, DESCRIPTION_KEY, DISPLAY_NAME_KEY,
    NAME_KEY, UPDATE_TIME_KEY,
};
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;

const RESOURCE_PATH: &str = "/trust-score-profiles";

pub const NODE_CLASSIFICATION_KEY: &str = "node_classification";
pub const DIMENSION_KEY: &str = "dimension";
pub const SCHEDULE_KEY: &str = "schedule";
pub const WEIGHT_KEY: &str = "weight";

wire_enum! {
    /// Dimensions a trust score can be computed from.
    pub enum DimensionName {
        Origin => ("origin", "TRUST_SCORE_DIMENSION_ORIGIN"),
        Validity => ("validity", "TRUST_SCORE_DIMENSION_VALIDITY"),
        Completeness => ("completeness", "TRUST_SCORE_DIMENSION_COMPLETENESS"),
        Freshness => ("freshness", "TRUST_SCORE_DIMENSION_FRESHNESS"),
        Verification => ("verification", "TRUST_SCORE_DIMENSION_VERIFICATION"),
    }
}

wire_enum! {
    /// How often the score is recalculated.
    pub enum ScheduleFrequency {
        SixHours => ("six_hours", "UPDATE_FREQUENCY_SIX_HOURS"),
        TwelveHours => ("twelve_hours", "UPDATE_FREQUENCY_TWELVE_HOURS"),
        Daily => ("daily", "UPDATE_FREQUENCY_DAILY"),
        Weekly => ("weekly", "UPDATE_FREQUENCY_WEEKLY"),
        Monthly => ("monthly", "UPDATE_FREQUENCY_MONTHLY"),
    }
}

pub struct TrustScoreProfileResource;

fn resource_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            let dimension = Schema::new(vec![
                Attribute::string(NAME_KEY)
                    .required()
                    .validate(Validator::OneOf(DimensionName::ALL))
                    .describe("Name of the trust score dimension."),
                Attribute::float(WEIGHT_KEY)
                    .required()
                    .validate(Validator::FloatBetween(0.0, 1.0))
                    .describe("How relevant the dimension is in the score calculation."),
            ]);
            Arc::new(Schema::new(vec![
                common::location(),
                common::customer_id().into_computed(),
                common::app_space_id().into_computed(),
                common::name(),
                common::display_name(),
                common::description(),
                Attribute::string(NODE_CLASSIFICATION_KEY)
                    .required()
                    .force_new()
                    .validate(Validator::NotEmpty)
                    .describe("Node label the profile scores, cannot be modified once set."),
                Attribute::object_list(DIMENSION_KEY, dimension)
                    .required()
                    .min_items(1)
                    .describe("Dimensions used to calculate the trust score."),
                Attribute::string(SCHEDULE_KEY)
                    .required()
                    .validate(Validator::OneOf(ScheduleFrequency::ALL))
                    .describe("Time between re-calculations."),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

fn build_dimensions(diags: &mut Diagnostics, data: &ResourceData) -> Vec<TrustScoreDimension> {
    data.get_object_list(DIMENSION_KEY)
        .into_iter()
        .filter_map(|dim| {
            let name = dim.get(NAME_KEY).and_then(Value::as_str).unwrap_or_default();
            let weight = dim.get(WEIGHT_KEY).and_then(Value::as_f64).unwrap_or(0.0);
            match DimensionName::from_config(name) {
                Some(known) => Some(TrustScoreDimension {
                    name: known.as_wire().to_string(),
                    weight,
                }),
                None => {
                    diags.push(Diagnostic::plugin_error(format!(
                        "unsupported trust score dimension {name:?}"
                    )));
                    None
                }
            }
        })
        .collect()
}

fn schedule_to_wire(diags: &mut Diagnostics, value: &str) -> String {
    match ScheduleFrequency::from_config(value) {
        Some(frequency) => frequency.as_wire().to_string(),
        None => {
            diags.push(Diagnostic::plugin_error(format!(
                "unsupported schedule {value:?}"
            )));
            String::new()
        }
    }
}

fn flatten(diags: &mut Diagnostics, data: &mut ResourceData, resp: TrustScoreProfileResponse) {
    data.set_id(resp.id);
    data.set(
        diags,
        CUSTOMER_ID_KEY,
        flatten_optional_string(resp.customer_id.clone()),
    );
    data.set(
        diags,
        APP_SPACE_ID_KEY,
        flatten_optional_string(resp.app_space_id.clone()),
    );
    set_location_from(
        diags,
        data,
        resp.customer_id.as_deref(),
        resp.app_space_id.as_deref(),
    );
    data.set(diags, NAME_KEY, resp.name);
    data.set(
        diags,
        DISPLAY_NAME_KEY,
        flatten_optional_string(resp.display_name),
    );
    data.set(
        diags,
        DESCRIPTION_KEY,
        flatten_optional_string(resp.description),
    );
    data.set(
        diags,
        NODE_CLASSIFICATION_KEY,
        flatten_optional_string(resp.node_classification),
    );

    let dimensions: Vec<Value> = resp
        .dimensions
        .into_iter()
        .map(|dim| {
            // Fall back to the raw value so an unknown dimension is visible
            // in state rather than silently dropped.
            let name = DimensionName::from_wire(&dim.name)
                .map(|d| d.as_config().to_string())
                .unwrap_or(dim.name);
            // Single-precision weights round-trip with noise; keep 4 places.
            let weight = (dim.weight * 10_000.0).round() / 10_000.0;
            json!({ NAME_KEY: name, WEIGHT_KEY: weight })
        })
        .collect();
    data.set(diags, DIMENSION_KEY, Value::Array(dimensions));

    if let Some(schedule) = resp.schedule {
        let value = ScheduleFrequency::from_wire(&schedule)
            .map(|s| s.as_config().to_string())
            .unwrap_or(schedule);
        data.set(diags, SCHEDULE_KEY, value);
    }
    data.set(diags, CREATE_TIME_KEY, flatten_time(resp.create_time));
    data.set(diags, UPDATE_TIME_KEY, flatten_time(resp.update_time));
}

#[async_trait]
impl ManagedResource for TrustScoreProfileResource {
    fn type_name(&self) -> &'static str {
        "stratos_trust_score_profile"
    }

    fn schema(&self) -> Arc<Schema> {
        resource_schema()
    }

    async fn create(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let req = CreateTrustScoreProfileRequest {
            location: data.get_string(common::LOCATION_KEY),
            name: data.get_string(NAME_KEY),
            display_name: optional_string(data, DISPLAY_NAME_KEY),
            description: optional_string(data, DESCRIPTION_KEY),
            node_classification: data.get_string(NODE_CLASSIFICATION_KEY),
            schedule: schedule_to_wire(&mut d, &data.get_string(SCHEDULE_KEY)),
            dimensions: build_dimensions(&mut d, data),
        };
        if d.has_error() {
            return d;
        }

        let result = client
            .post::<_, TrustScoreProfileResponse>(RESOURCE_PATH, &req, data.timeout())
            .await;
        let Some(resp) = api_result(&mut d, result) else {
            return d;
        };
        data.set_id(&resp.id);
        client.record_bookmark(resp.bookmark.as_deref());

        d.extend(self.read(client, data).await);
        d
    }

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let path = build_read_path(RESOURCE_PATH, data);
        let result = client
            .get::<TrustScoreProfileResponse>(&path, data.timeout())
            .await;
        let Some(resp) = read_result(&mut d, data, result) else {
            return d;
        };
        flatten(&mut d, data, resp);
        d
    }

    async fn update(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let schedule = update_optional_string(data, SCHEDULE_KEY)
            .map(|s| schedule_to_wire(&mut d, &s));
        let dimensions = data
            .has_change(DIMENSION_KEY)
            .then(|| build_dimensions(&mut d, data));
        if d.has_error() {
            return d;
        }

        let req = UpdateTrustScoreProfileRequest {
            display_name: update_optional_string(data, DISPLAY_NAME_KEY),
            description: update_optional_string(data, DESCRIPTION_KEY),
            schedule,
            dimensions,
        };
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        let result = client
            .put::<_, TrustScoreProfileResponse>(&path, &req, data.timeout())
            .await;
        let Some(resp) = api_result(&mut d, result) else {
            return d;
        };
        client.record_bookmark(resp.bookmark.as_deref());

        d.extend(self.read(client, data).await);
        d
    }

    async fn delete(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let path = format!("{RESOURCE_PATH}/{}", data.id());
        api_result(&mut d, client.delete(&path, data.timeout()).await);
        d
    }
}

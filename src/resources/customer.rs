//! Customer data source
//!
//! Customers are provisioned out of band; configurations can only look them
//! up, by exact name match.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::api::models::ListCustomersResponse;
use crate::api::ConfigClient;
use crate::convert::{flatten_optional_string, flatten_time};
use crate::diag::{Diagnostic, Diagnostics};
use crate::resources::{api_result, DataSource};
use crate::schema::common::{
    self, CREATE_TIME_KEY, DESCRIPTION_KEY, DISPLAY_NAME_KEY, FILTER_KEY, NAME_KEY,
    UPDATE_TIME_KEY,
};
use crate::schema::Schema;
use crate::state::ResourceData;

const RESOURCE_PATH: &str = "/customers";

pub struct CustomerDataSource;

fn data_source_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                common::exact_name_filter(),
                crate::schema::Attribute::string(NAME_KEY).computed(),
                common::display_name().into_computed(),
                common::description().into_computed(),
                common::create_time(),
                common::update_time(),
            ]))
        })
        .clone()
}

#[async_trait]
impl DataSource for CustomerDataSource {
    fn type_name(&self) -> &'static str {
        "stratos_customer"
    }

    fn schema(&self) -> Arc<Schema> {
        data_source_schema()
    }

    async fn read(&self, client: &ConfigClient, data: &mut ResourceData) -> Diagnostics {
        let mut d = Diagnostics::new();
        let result = client
            .get::<ListCustomersResponse>(RESOURCE_PATH, data.timeout())
            .await;
        let Some(resp) = api_result(&mut d, result) else {
            return d;
        };

        let filter = data.get_string_list(FILTER_KEY);
        let Some(customer) = filter
            .iter()
            .find_map(|name| resp.customers.iter().find(|c| &c.name == name))
            .cloned()
        else {
            d.push(Diagnostic::error_detail(
                "Customer not found",
                format!("no customer matches the exact names [{}]", filter.join(", ")),
            ));
            return d;
        };

        data.set_id(customer.id);
        data.set(&mut d, NAME_KEY, customer.name);
        data.set(
            &mut d,
            DISPLAY_NAME_KEY,
            flatten_optional_string(customer.display_name),
        );
        data.set(
            &mut d,
            DESCRIPTION_KEY,
            flatten_optional_string(customer.description),
        );
        data.set(&mut d, CREATE_TIME_KEY, flatten_time(customer.create_time));
        data.set(&mut d, UPDATE_TIME_KEY, flatten_time(customer.update_time));
        d
    }
}

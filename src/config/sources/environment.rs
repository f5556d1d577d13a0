//! Environment source: SDBATCH__<SECTION>__<KEY>, e.g. SDBATCH__POLICY__STRICT_MODEL_SELECT=true.
//! `SDBATCH__ENDPOINTS` takes a comma separated list.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("SDBATCH")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("endpoints")
            .try_parsing(true),
    )
}

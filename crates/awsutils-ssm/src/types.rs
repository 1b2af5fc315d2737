use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParametersOutput {
    pub parameters: Vec<Parameter>,
    /// Requested names that do not exist.
    pub invalid_parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: Option<i64>,
}

impl From<&aws_sdk_ssm::types::Parameter> for Parameter {
    fn from(parameter: &aws_sdk_ssm::types::Parameter) -> Self {
        Self {
            name: parameter.name().unwrap_or_default().to_string(),
            value: parameter.value().unwrap_or_default().to_string(),
            kind: parameter
                .r#type()
                .map(|kind| kind.as_str())
                .unwrap_or_default()
                .to_string(),
            version: Option::from(parameter.version()),
        }
    }
}

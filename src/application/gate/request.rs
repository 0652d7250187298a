use crate::domain::{DeviceContext, GateRequest};
use url::Url;

impl GateRequest {
    pub fn new(access_code: impl Into<String>, device: DeviceContext) -> Self {
        Self {
            access_code: access_code.into(),
            device,
        }
    }

    /// Full request URL: `p`, `os`, `lng`, `devicemodel` and, when known, `country`.
    ///
    /// Existing query pairs on the endpoint are kept ahead of ours.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("p", &self.access_code)
                .append_pair("os", &self.device.os_name_version)
                .append_pair("lng", &self.device.preferred_language)
                .append_pair("devicemodel", &self.device.hardware_model_id);
            if let Some(region) = self.device.region_code.as_deref().filter(|r| !r.is_empty()) {
                query.append_pair("country", region);
            }
        }
        url
    }
}

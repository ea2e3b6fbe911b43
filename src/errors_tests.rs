// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for errors.rs

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::parameters::ClusterParameterName;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::InvalidFormat.status_code(), 400);
        assert_eq!(ErrorKind::OutOfBounds.status_code(), 400);
        assert_eq!(ErrorKind::GroupQuotaExceeded.status_code(), 402);
        assert_eq!(ErrorKind::UserQuotaExceeded.status_code(), 402);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::PolicyNotFound.status_code(), 404);
        assert_eq!(ErrorKind::Upstream.status_code(), 502);
        assert_eq!(ErrorKind::Timeout.status_code(), 504);
    }

    #[test]
    fn test_validation_error_kind_follows_source() {
        let err = ValidationError::Format {
            parameter: ClusterParameterName::ServerResourcesRequestsCpu,
            raw: "1Gi".to_string(),
            source: UnitError::InvalidUnit {
                value: "1Gi".to_string(),
                expected: "cores",
            },
        };
        assert_eq!(err.kind(), ErrorKind::InvalidUnit);
        assert_eq!(
            err.parameter(),
            ClusterParameterName::ServerResourcesRequestsCpu
        );
    }

    #[test]
    fn test_out_of_bounds_message_names_parameter_and_bounds() {
        let err = ValidationError::OutOfBounds {
            parameter: ClusterParameterName::NodeCount,
            min: "2".to_string(),
            max: "5".to_string(),
            value: "1".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("NODE_COUNT"), "got: {message}");
        assert!(message.contains("min: '2'"), "got: {message}");
        assert!(message.contains("max: '5'"), "got: {message}");
        assert!(message.contains("value: '1'"), "got: {message}");
    }

    #[test]
    fn test_gateway_error_kinds() {
        let err = GatewayError::from(StoreError::Timeout {
            name: "api-config-default".to_string(),
            timeout: std::time::Duration::from_secs(5),
        });
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.status_code(), 504);

        let err = GatewayError::GroupQuotaExceeded {
            group: "free".to_string(),
            limit: 2,
            live: 2,
        };
        assert_eq!(err.kind(), ErrorKind::GroupQuotaExceeded);
        assert_eq!(err.status_code(), 402);
    }

    #[test]
    fn test_invalid_group_lists_available_groups() {
        let err = GatewayError::InvalidGroup {
            group: "admin".to_string(),
            available: vec!["developer".to_string(), "default".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid group: admin. Available groups: developer, default."
        );
    }
}

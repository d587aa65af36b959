//! The built-in persona catalogue.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::core::CcsetupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaKind {
    Architect,
    DataScientist,
    Developer,
    DevopsEngineer,
    IntegrationSpecialist,
    PerformanceEngineer,
    ProductManager,
    SecurityEngineer,
    Tester,
}

impl PersonaKind {
    pub const ALL: [Self; 9] = [
        Self::Architect,
        Self::DataScientist,
        Self::Developer,
        Self::DevopsEngineer,
        Self::IntegrationSpecialist,
        Self::PerformanceEngineer,
        Self::ProductManager,
        Self::SecurityEngineer,
        Self::Tester,
    ];

    /// Identifier used on the command line and as the template file stem.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::DataScientist => "data-scientist",
            Self::Developer => "developer",
            Self::DevopsEngineer => "devops-engineer",
            Self::IntegrationSpecialist => "integration-specialist",
            Self::PerformanceEngineer => "performance-engineer",
            Self::ProductManager => "product-manager",
            Self::SecurityEngineer => "security-engineer",
            Self::Tester => "tester",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Architect => "Architect",
            Self::DataScientist => "Data Scientist",
            Self::Developer => "Developer",
            Self::DevopsEngineer => "DevOps Engineer",
            Self::IntegrationSpecialist => "Integration Specialist",
            Self::PerformanceEngineer => "Performance Engineer",
            Self::ProductManager => "Product Manager",
            Self::SecurityEngineer => "Security Engineer",
            Self::Tester => "Tester",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Architect => "System design, scalability, and technical architecture",
            Self::DataScientist => "ML models, data quality, and statistical rigor",
            Self::Developer => "Code quality, patterns, and implementation best practices",
            Self::DevopsEngineer => "CI/CD, deployment, infrastructure, and monitoring",
            Self::IntegrationSpecialist => "API design, service integration, and data flow",
            Self::PerformanceEngineer => "Optimization, load testing, and scalability",
            Self::ProductManager => "UX, business logic, and feature completeness",
            Self::SecurityEngineer => "Vulnerability assessment, security auditing, and compliance",
            Self::Tester => "Testing strategies, quality assurance, and validation",
        }
    }

    #[must_use]
    pub const fn focus_areas(self) -> &'static [&'static str] {
        match self {
            Self::Architect => &[
                "System Design",
                "Scalability Planning",
                "Technology Selection",
                "Integration Patterns",
                "Performance Architecture",
                "Future-Proofing",
            ],
            Self::DataScientist => &[
                "Data Quality & Integrity",
                "Statistical Rigor",
                "Model Performance",
                "Reproducibility",
                "Feature Engineering",
                "Ethical AI & Bias",
                "Experiment Design",
                "Model Interpretability",
            ],
            Self::Developer => &[
                "Code Quality",
                "Design Patterns",
                "Testing Strategy",
                "Documentation",
                "Refactoring",
                "Standards Compliance",
            ],
            Self::DevopsEngineer => &[
                "Deployment Strategy",
                "Infrastructure as Code",
                "Containerization",
                "Monitoring & Logging",
                "Scalability",
                "Environment Configuration",
                "Backup & Recovery",
            ],
            Self::IntegrationSpecialist => &[
                "API Design",
                "Data Flow",
                "Error Propagation",
                "Service Contracts",
                "Integration Testing",
                "Rate Limiting",
                "Circuit Breakers",
                "Message Formats",
            ],
            Self::PerformanceEngineer => &[
                "Performance Bottlenecks",
                "Resource Utilization",
                "Database Optimization",
                "Caching Strategy",
                "Asynchronous Processing",
                "Load Testing Readiness",
                "Scalability Patterns",
                "Profiling Integration",
            ],
            Self::ProductManager => &[
                "User Experience",
                "Feature Completeness",
                "Business Logic",
                "Error Handling UX",
                "Accessibility",
                "Performance Impact",
                "Data Analytics",
                "Edge Cases",
            ],
            Self::SecurityEngineer => &[
                "Vulnerability Assessment",
                "Authentication & Authorization",
                "Data Protection",
                "Input Validation",
                "Security Configuration",
                "Dependency Security",
                "Secrets Management",
                "Compliance",
            ],
            Self::Tester => &[
                "Test Coverage",
                "Quality Assurance",
                "Test Automation",
                "Edge Case Testing",
                "Performance Testing",
                "User Acceptance",
            ],
        }
    }

    #[must_use]
    pub const fn responsibilities(self) -> &'static [&'static str] {
        match self {
            Self::Architect => &[
                "Overall architecture patterns and design decisions",
                "Horizontal and vertical scaling strategies",
                "Framework and tool recommendations",
                "Service communication and data flow design",
                "System-level performance considerations",
                "Extensibility and maintainability planning",
            ],
            Self::DataScientist => &[
                "Data validation, cleaning, and bias detection",
                "Hypothesis testing, significance analysis, and methodology",
                "Model evaluation, validation, and performance metrics",
                "Experiment tracking, version control, and documentation",
                "Feature selection, transformation, and domain knowledge",
                "Fairness, bias detection, and responsible AI practices",
                "A/B testing, statistical power, and experimental methodology",
                "Explainable AI and model transparency",
            ],
            Self::Developer => &[
                "Clean code principles and maintainability",
                "Appropriate pattern usage and implementation",
                "Unit testing, TDD, and test coverage",
                "Code documentation and API design",
                "Code improvement and technical debt reduction",
                "Coding standards and style guidelines",
            ],
            Self::DevopsEngineer => &[
                "CI/CD pipeline design and automation",
                "Terraform, CloudFormation, and configuration management",
                "Docker, Kubernetes, and orchestration",
                "Application monitoring, alerting, and observability",
                "Auto-scaling, load balancing, and performance optimization",
                "Development, staging, and production environments",
                "Disaster recovery and business continuity planning",
            ],
            Self::IntegrationSpecialist => &[
                "RESTful API design and GraphQL implementation",
                "Inter-service communication and data consistency",
                "Distributed system error handling",
                "API versioning and backward compatibility",
                "Service integration and contract testing",
                "API throttling and usage control",
                "Fault tolerance and resilience patterns",
                "Data serialization and protocol design",
            ],
            Self::PerformanceEngineer => &[
                "Identification and resolution of performance issues",
                "CPU, memory, and I/O optimization",
                "Query performance and indexing strategies",
                "Application and database caching implementation",
                "Background jobs and async operation design",
                "Performance testing and capacity planning",
                "Horizontal scaling and performance architecture",
                "Performance monitoring and profiling tools",
            ],
            Self::ProductManager => &[
                "User journey optimization and usability",
                "Business requirement validation and feature gaps",
                "Requirement translation and business rule implementation",
                "User-friendly error messages and recovery flows",
                "WCAG compliance and inclusive design",
                "User-perceived performance and experience optimization",
                "User behavior tracking and analytics implementation",
                "User scenario validation and edge case handling",
            ],
            Self::SecurityEngineer => &[
                "Security threat analysis and OWASP compliance",
                "Secure access control implementation",
                "Encryption, data privacy, and secure storage",
                "SQL injection, XSS, and input sanitization",
                "Secure headers, HTTPS, and security policies",
                "Third-party library vulnerability scanning",
                "Secure credential and API key handling",
                "GDPR, HIPAA, and regulatory requirement adherence",
            ],
            Self::Tester => &[
                "Comprehensive testing strategy and coverage analysis",
                "Bug prevention and quality gates",
                "Automated testing frameworks and CI integration",
                "Boundary conditions and error scenarios",
                "Load testing and performance validation",
                "End-to-end testing and user journey validation",
            ],
        }
    }

    /// Keywords that make this persona a suggestion for a free-text context.
    #[must_use]
    pub const fn activation_triggers(self) -> &'static [&'static str] {
        match self {
            Self::Architect => &["architecture", "design", "scalability", "system"],
            Self::DataScientist => &["data", "ml", "model", "statistics", "experiment"],
            Self::Developer => &["code", "development", "testing", "patterns"],
            Self::DevopsEngineer => &["deployment", "ci/cd", "docker", "kubernetes", "monitoring"],
            Self::IntegrationSpecialist => &["api", "integration", "services", "microservices"],
            Self::PerformanceEngineer => &["performance", "optimization", "load", "scaling"],
            Self::ProductManager => &["ux", "business", "user", "requirements"],
            Self::SecurityEngineer => &["security", "vulnerability", "auth", "compliance"],
            Self::Tester => &["test", "quality", "qa", "validation"],
        }
    }

    /// Slash commands this persona is suited to.
    #[must_use]
    pub const fn command_specializations(self) -> &'static [&'static str] {
        match self {
            Self::Architect => &["api-design", "performance-audit", "containerize"],
            Self::DataScientist => &["data-exploration", "model-development", "experiment-tracking", "data-pipeline"],
            Self::Developer => &["create-feature", "integration-test", "check-all"],
            Self::DevopsEngineer => &["setup-ci", "containerize", "deploy-config"],
            Self::IntegrationSpecialist => &["api-design", "integration-test", "data-migration"],
            Self::PerformanceEngineer => &["performance-audit", "load-test"],
            Self::ProductManager => &["analyze-requirements", "create-docs"],
            Self::SecurityEngineer => &["security-audit", "secrets-scan", "security-headers"],
            Self::Tester => &["integration-test", "load-test", "check-all"],
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Accepts the id (`devops-engineer`, `devops_engineer`) or the display name
/// (`DevOps Engineer`), case-insensitively.
impl FromStr for PersonaKind {
    type Err = CcsetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let as_id = normalized.replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|p| p.id() == as_id || p.display_name().to_lowercase() == normalized)
            .ok_or_else(|| CcsetupError::UnknownPersona { name: s.to_string() })
    }
}

// Integration tests - full dispatch path over mock collaborators
